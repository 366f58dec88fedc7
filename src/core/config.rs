#[derive(Debug, Clone)]
pub struct Margin {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margin {
    fn default() -> Self {
        Margin {
            top: 15.0,
            bottom: 20.0,
            left: 15.0,
            right: 15.0,
        }
    }
}

impl Margin {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Margin { top, bottom, left, right }
    }

    pub fn uniform(size: f32) -> Self {
        Margin {
            top: size,
            bottom: size,
            left: size,
            right: size,
        }
    }
}

/// Page geometry and typography for the PDF output. Dimensions are in mm.
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub width: f32,
    pub height: f32,
    pub margin: Margin,
    pub title_size: f32,
    pub heading_size: f32,
    pub body_size: f32,
    pub small_size: f32,
    pub line_height: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        // A4 portrait
        PageConfig {
            width: 210.0,
            height: 297.0,
            margin: Margin::default(),
            title_size: 24.0,
            heading_size: 12.0,
            body_size: 10.0,
            small_size: 8.0,
            line_height: 5.0,
        }
    }
}

impl PageConfig {
    pub fn builder() -> PageConfigBuilder {
        PageConfigBuilder::default()
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin.left - self.margin.right
    }

    pub fn top_y(&self) -> f32 {
        self.height - self.margin.top
    }
}

#[derive(Default)]
pub struct PageConfigBuilder {
    margin: Option<Margin>,
    body_size: Option<f32>,
    line_height: Option<f32>,
}

impl PageConfigBuilder {
    pub fn margin(mut self, margin: Margin) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn body_size(mut self, size: f32) -> Self {
        self.body_size = Some(size);
        self
    }

    pub fn line_height(mut self, height: f32) -> Self {
        self.line_height = Some(height);
        self
    }

    pub fn build(self) -> PageConfig {
        let default = PageConfig::default();
        PageConfig {
            margin: self.margin.unwrap_or(default.margin),
            body_size: self.body_size.unwrap_or(default.body_size),
            line_height: self.line_height.unwrap_or(default.line_height),
            ..default
        }
    }
}
