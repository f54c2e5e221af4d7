use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Which set of build steps a trigger asks for.
///
/// Sequences are only requests; the orchestrator turns them into a set of
/// [`BuildStep`](crate::build::BuildStep)s and merges concurrent requests by
/// union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSequence {
    /// clean -> (scripts, styles) -> generate
    Full,
    /// (scripts, styles) -> generate
    Rebuild,
    /// scripts + styles only
    Compile,
    /// generator only
    Generate,
    /// remove outputs only
    Clean,
}

impl Default for BuildSequence {
    fn default() -> Self {
        BuildSequence::Rebuild
    }
}

impl FromStr for BuildSequence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(BuildSequence::Full),
            "rebuild" => Ok(BuildSequence::Rebuild),
            "compile" => Ok(BuildSequence::Compile),
            "generate" => Ok(BuildSequence::Generate),
            "clean" => Ok(BuildSequence::Clean),
            other => Err(format!(
                "invalid build sequence: {other} (expected one of full, rebuild, compile, generate, clean)"
            )),
        }
    }
}

/// Mode argument passed to the external generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// Write the site once and exit.
    Build,
    /// Let the generator serve (and usually watch) by itself; never exits.
    Serve,
}

impl Default for GeneratorMode {
    fn default() -> Self {
        GeneratorMode::Build
    }
}

impl GeneratorMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            GeneratorMode::Build => "build",
            GeneratorMode::Serve => "serve",
        }
    }
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}
