use std::borrow::Cow;

/// Token replaced by the shell's own process id.
pub const PID_PLACEHOLDER: &str = "$$";

#[derive(Debug, Clone)]
pub struct PidExpander {
    pid: String,
}

impl Default for PidExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl PidExpander {
    pub fn new() -> Self {
        Self::with_pid(std::process::id())
    }

    pub fn with_pid(pid: u32) -> Self {
        Self {
            pid: pid.to_string(),
        }
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Replaces every non-overlapping `$$`, scanning left to right, so `$$$`
    /// becomes `<pid>$`.
    pub fn expand<'a>(&self, token: &'a str) -> Cow<'a, str> {
        if token.contains(PID_PLACEHOLDER) {
            Cow::Owned(token.replace(PID_PLACEHOLDER, &self.pid))
        } else {
            Cow::Borrowed(token)
        }
    }
}
