use regex::Regex;

/// Include/exclude patterns over directive command strings.
///
/// A command passes when it matches at least one include pattern (or there
/// are none) and no exclude pattern. Patterns are unanchored.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl Filter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, regex::Error> {
        let compile = |patterns: &[S]| {
            patterns
                .iter()
                .map(|p| Regex::new(p.as_ref()))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Filter {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn allows(&self, command: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|re| re.is_match(command));
        included && !self.exclude.iter().any(|re| re.is_match(command))
    }
}
