//! Runner registry - fixed per-language execution strategies
//!
//! Each supported language maps to one immutable [`Strategy`]. Lookups never
//! fail: unknown keys resolve to the JavaScript strategy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;

/// Languages with a registered strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    JavaScript,
    TypeScript,
    Dart,
    Python,
    Ruby,
    Go,
    Php,
    Rust,
}

impl Language {
    /// All registered languages, in display order
    pub const ALL: [Language; 8] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Dart,
        Language::Python,
        Language::Ruby,
        Language::Go,
        Language::Php,
        Language::Rust,
    ];

    /// Normalize a language key, falling back to JavaScript
    pub fn from_key(key: &str) -> Self {
        key.parse().unwrap_or_default()
    }

    /// Guess the language from a file extension (without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" => Some(Language::TypeScript),
            "dart" => Some(Language::Dart),
            "py" => Some(Language::Python),
            "rb" => Some(Language::Ruby),
            "go" => Some(Language::Go),
            "php" => Some(Language::Php),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "dart" => Ok(Language::Dart),
            "python" | "py" => Ok(Language::Python),
            "ruby" | "rb" => Ok(Language::Ruby),
            "go" => Ok(Language::Go),
            "php" => Ok(Language::Php),
            "rust" | "rs" => Ok(Language::Rust),
            _ => Err(crate::Error::InvalidInput(format!(
                "Unsupported language: {}. Supported: javascript, typescript, dart, python, ruby, go, php, rust",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::JavaScript => write!(f, "javascript"),
            Language::TypeScript => write!(f, "typescript"),
            Language::Dart => write!(f, "dart"),
            Language::Python => write!(f, "python"),
            Language::Ruby => write!(f, "ruby"),
            Language::Go => write!(f, "go"),
            Language::Php => write!(f, "php"),
            Language::Rust => write!(f, "rust"),
        }
    }
}

/// One element of an argument template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    /// Passed through as-is
    Literal(&'static str),
    /// Path of the materialized source file
    SourceFile,
    /// Path of the compiled binary (compile-then-run only)
    OutputBinary,
}

/// How a strategy turns a materialized unit into running processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPlan {
    /// Interpreted: a single process
    RunOnly {
        program: &'static str,
        args: &'static [Arg],
    },
    /// Compiled: build the unit's output binary, then execute it
    CompileThenRun {
        compiler: &'static str,
        compile_args: &'static [Arg],
    },
}

impl LaunchPlan {
    /// The executable that must be on PATH for this plan to work
    pub fn entry_program(&self) -> &'static str {
        match self {
            LaunchPlan::RunOnly { program, .. } => *program,
            LaunchPlan::CompileThenRun { compiler, .. } => *compiler,
        }
    }
}

/// Immutable per-language recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub language: Language,
    /// File extension without the leading dot
    pub extension: &'static str,
    /// Whether materialization creates a dedicated directory
    pub builds_artifact_dir: bool,
    pub launch_plan: LaunchPlan,
}

const SOURCE_ONLY: &[Arg] = &[Arg::SourceFile];

/// Built-in strategy table
static BUILTIN: [Strategy; 8] = [
    Strategy {
        language: Language::JavaScript,
        extension: "js",
        builds_artifact_dir: false,
        launch_plan: LaunchPlan::RunOnly { program: "node", args: SOURCE_ONLY },
    },
    Strategy {
        language: Language::TypeScript,
        extension: "ts",
        builds_artifact_dir: false,
        launch_plan: LaunchPlan::RunOnly {
            program: "npx",
            args: &[Arg::Literal("ts-node"), Arg::SourceFile],
        },
    },
    Strategy {
        language: Language::Dart,
        extension: "dart",
        builds_artifact_dir: false,
        launch_plan: LaunchPlan::RunOnly { program: "dart", args: SOURCE_ONLY },
    },
    Strategy {
        language: Language::Python,
        extension: "py",
        builds_artifact_dir: false,
        launch_plan: LaunchPlan::RunOnly { program: "python3", args: SOURCE_ONLY },
    },
    Strategy {
        language: Language::Ruby,
        extension: "rb",
        builds_artifact_dir: false,
        launch_plan: LaunchPlan::RunOnly { program: "ruby", args: SOURCE_ONLY },
    },
    Strategy {
        language: Language::Go,
        extension: "go",
        builds_artifact_dir: false,
        launch_plan: LaunchPlan::RunOnly {
            program: "go",
            args: &[Arg::Literal("run"), Arg::SourceFile],
        },
    },
    Strategy {
        language: Language::Php,
        extension: "php",
        builds_artifact_dir: false,
        launch_plan: LaunchPlan::RunOnly { program: "php", args: SOURCE_ONLY },
    },
    Strategy {
        language: Language::Rust,
        extension: "rs",
        builds_artifact_dir: true,
        launch_plan: LaunchPlan::CompileThenRun {
            compiler: "rustc",
            compile_args: &[Arg::SourceFile, Arg::Literal("-o"), Arg::OutputBinary],
        },
    },
];

/// Availability of a strategy's toolchain on this machine
#[derive(Debug, Clone, Serialize)]
pub struct ToolchainStatus {
    pub language: Language,
    pub program: &'static str,
    /// Resolved executable path, if found on PATH
    pub path: Option<PathBuf>,
}

impl ToolchainStatus {
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

/// Mapping from language to strategy, fixed at construction
#[derive(Debug, Clone)]
pub struct RunnerRegistry {
    strategies: HashMap<Language, Strategy>,
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RunnerRegistry {
    /// Registry with the built-in strategy table
    pub fn builtin() -> Self {
        let strategies = BUILTIN.iter().map(|s| (s.language, *s)).collect();
        RunnerRegistry { strategies }
    }

    /// Resolve a raw language key (case-insensitive, aliases allowed)
    pub fn resolve(&self, key: &str) -> &Strategy {
        self.get(Language::from_key(key))
    }

    /// Strategy for an already-normalized language
    pub fn get(&self, language: Language) -> &Strategy {
        match self.strategies.get(&language) {
            Some(strategy) => strategy,
            // The table always holds JavaScript
            None => &BUILTIN[0],
        }
    }

    /// All strategies in display order
    pub fn strategies(&self) -> impl Iterator<Item = &Strategy> {
        Language::ALL.into_iter().map(move |l| self.get(l))
    }

    /// Check which toolchains are installed
    pub fn probe_toolchains(&self) -> Vec<ToolchainStatus> {
        self.strategies()
            .map(|s| {
                let program = s.launch_plan.entry_program();
                ToolchainStatus {
                    language: s.language,
                    program,
                    path: which::which(program).ok(),
                }
            })
            .collect()
    }
}
