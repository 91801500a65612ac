/// A zero-content placeholder in a galley.
///
/// Template markers switch the template that receives the following
/// content. Reference markers (footnotes, literature, authors) point at an
/// id and carry nothing themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: String,
    pub reference: Option<String>,
    template: bool,
}

impl Marker {
    pub fn template(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            reference: None,
            template: true,
        }
    }

    pub fn reference(kind: &str, reference: Option<String>) -> Self {
        Self {
            kind: kind.to_string(),
            reference,
            template: false,
        }
    }

    pub fn is_template(&self) -> bool {
        self.template
    }
}
