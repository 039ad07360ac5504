// Process-wide execution settings for graded commands
use std::ffi::{OsStr, OsString};

/// Variables copied from the host when present
const INHERITED_VARS: [&str; 2] = ["PATH", "HOME"];

/// Variables every child gets regardless of the host
const FIXED_VARS: [(&str, &str); 3] = [
    ("FORCE_COLOR", "true"),
    ("DOTNET_CLI_HOME", "/tmp"),
    ("DOTNET_NOLOGO", "true"),
];

/// The complete environment handed to setup and test commands
///
/// Children never see the rest of the host environment, so every command
/// runs against the same small set of variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildEnvironment {
    vars: Vec<(OsString, OsString)>,
}

impl ChildEnvironment {
    /// Build the allowlist from the current process environment
    pub fn from_host() -> Self {
        let inherited = INHERITED_VARS
            .iter()
            .filter_map(|name| std::env::var_os(name).map(|value| (OsString::from(*name), value)));
        Self::with_inherited(inherited)
    }

    /// Build the allowlist from explicit inherited values (unknown names are dropped)
    pub fn with_inherited<I, K, V>(inherited: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut vars: Vec<(OsString, OsString)> = inherited
            .into_iter()
            .map(|(k, v)| -> (OsString, OsString) { (k.into(), v.into()) })
            .filter(|(k, _)| INHERITED_VARS.iter().any(|name| k.as_os_str() == OsStr::new(name)))
            .collect();

        vars.extend(
            FIXED_VARS
                .iter()
                .map(|(k, v)| (OsString::from(*k), OsString::from(*v))),
        );

        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .find(|(k, _)| k.as_os_str() == OsStr::new(name))
            .map(|(_, v)| v.as_os_str())
    }

    pub fn vars(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}
