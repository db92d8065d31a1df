/// The commands an accessor of one model may issue.
///
/// Computed once from the type's base vocabulary: intersected with the
/// allow-list when one is given, then with the deny-list removed. Order is
/// always the base vocabulary's order. Names are compared lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSet {
    effective: Vec<String>,
}

impl CommandSet {
    pub fn compute<S: AsRef<str>>(
        base: &[S],
        allowed: Option<&[S]>,
        denied: Option<&[S]>,
    ) -> Self {
        let allowed = allowed.map(lowercase_all);
        let denied = denied.map(lowercase_all);

        let mut effective: Vec<String> = Vec::with_capacity(base.len());
        for command in base {
            let command = command.as_ref().to_ascii_lowercase();
            if effective.contains(&command) {
                continue;
            }
            if let Some(allowed) = &allowed {
                if !allowed.contains(&command) {
                    continue;
                }
            }
            if let Some(denied) = &denied {
                if denied.contains(&command) {
                    continue;
                }
            }
            effective.push(command);
        }

        Self { effective }
    }

    pub fn commands(&self) -> &[String] {
        &self.effective
    }

    pub fn contains(&self, command: &str) -> bool {
        self.effective
            .iter()
            .any(|c| c.eq_ignore_ascii_case(command))
    }

    pub fn len(&self) -> usize {
        self.effective.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effective.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.effective.iter().map(String::as_str)
    }
}

fn lowercase_all<S: AsRef<str>>(commands: &[S]) -> Vec<String> {
    commands
        .iter()
        .map(|c| c.as_ref().to_ascii_lowercase())
        .collect()
}
