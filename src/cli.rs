//! Parseo mínimo de argumentos del binario `statflow`.
//!
//! ```text
//! statflow run <kind> --data <dataset.json> [--hash <override>]
//! statflow clear
//! statflow kinds
//! ```
use std::path::PathBuf;

use stat_core::ArtifactKind;

use crate::error::AppError;

pub const USAGE: &str = "statflow run <kind> --data <dataset.json> [--hash <override>] | statflow clear | statflow kinds";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run { kind: ArtifactKind, data: PathBuf, hash: Option<String> },
    Clear,
    Kinds,
}

/// `args` sin el nombre del programa.
pub fn parse_args(args: &[String]) -> Result<Command, AppError> {
    let usage = || AppError::Usage(USAGE.to_string());
    match args.first().map(String::as_str) {
        Some("clear") => Ok(Command::Clear),
        Some("kinds") => Ok(Command::Kinds),
        Some("run") => {
            let raw_kind = args.get(1).ok_or_else(usage)?;
            let kind = ArtifactKind::parse(raw_kind)
                .ok_or_else(|| AppError::Usage(format!("unknown artifact kind '{raw_kind}' (see `statflow kinds`)")))?;
            let mut data: Option<PathBuf> = None;
            let mut hash: Option<String> = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--data" => {
                        i += 1;
                        data = args.get(i).map(PathBuf::from);
                    }
                    "--hash" => {
                        i += 1;
                        hash = args.get(i).cloned();
                    }
                    other => return Err(AppError::Usage(format!("unexpected argument '{other}'"))),
                }
                i += 1;
            }
            Ok(Command::Run { kind, data: data.ok_or_else(usage)?, hash })
        }
        _ => Err(usage()),
    }
}

/// Una línea por kind con sus prerrequisitos.
pub fn describe_kinds() -> Vec<String> {
    ArtifactKind::ALL
        .iter()
        .map(|k| {
            let pre: Vec<&str> = k.prerequisites().iter().map(|p| p.as_str()).collect();
            if pre.is_empty() {
                k.as_str().to_string()
            } else {
                format!("{} <- {}", k.as_str(), pre.join(", "))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> { s.split_whitespace().map(String::from).collect() }

    #[test]
    fn run_with_hash() {
        let cmd = parse_args(&args("run p-values --data d.json --hash abc")).unwrap();
        assert_eq!(cmd, Command::Run { kind: ArtifactKind::PValues, data: "d.json".into(), hash: Some("abc".into()) });
    }

    #[test]
    fn run_requires_data() {
        assert!(matches!(parse_args(&args("run pca_loadings")), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(&args("run nope --data x")), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(&[]), Err(AppError::Usage(_))));
    }

    #[test]
    fn kinds_lists_prerequisites() {
        let lines = describe_kinds();
        assert_eq!(lines.len(), ArtifactKind::ALL.len());
        assert!(lines.contains(&"k_means_results <- numbers_only".to_string()));
    }
}
