/// Sink for the human-readable progress lines a run prints.
pub trait Console {
    fn line(&mut self, message: &str);
}

/// Writes every line to standard output.
#[derive(Debug, Default)]
pub struct Stdout;

impl Console for Stdout {
    fn line(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Keeps lines in memory instead of printing them.
#[derive(Debug, Default)]
pub struct Transcript {
    pub lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for Transcript {
    fn line(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}
