//! External ESTree parser subprocess.
//!
//! The parser is a separate program invoked as
//! `<program> <args...> <source_path> <output_json_path> <source_type>`;
//! exit code 0 with the AST JSON written to the output path on success,
//! non-zero with a diagnostic on stderr on failure. The subprocess gets
//! its own kill timeout so one hung file never eats the extension's
//! whole budget.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use extgraph_ir::config::{ParserSelector, SourceType};
use extgraph_ir::features::ast::infrastructure::ingest::ingest_json;
use extgraph_ir::features::ast::ports::parser::EstreeParser;
use extgraph_ir::shared::models::{AnalysisError, AnalysisResult};
use extgraph_ir::SyntaxTree;

pub struct SubprocessParser {
    selector: ParserSelector,
}

impl SubprocessParser {
    pub fn new(selector: ParserSelector) -> Self {
        Self { selector }
    }

    fn run(&self, source_path: &Path, source_type: SourceType) -> AnalysisResult<String> {
        let file = source_path.display().to_string();
        let output_dir = tempfile::tempdir()?;
        let output_path = output_dir.path().join("ast.json");

        let mut child = Command::new(&self.selector.program)
            .args(&self.selector.args)
            .arg(source_path)
            .arg(&output_path)
            .arg(source_type.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AnalysisError::parse(&file, format!("cannot spawn parser: {e}")))?;

        let budget = Duration::from_secs(self.selector.timeout_seconds);
        let started = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if started.elapsed() >= budget => {
                    warn!(file, "parser subprocess timed out; killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AnalysisError::parse(
                        &file,
                        format!(
                            "parser timed out after {}s",
                            self.selector.timeout_seconds
                        ),
                    ));
                }
                None => std::thread::sleep(Duration::from_millis(20)),
            }
        };

        if !status.success() {
            let mut diagnostic = String::new();
            if let Some(mut stderr) = child.stderr.take() {
                use std::io::Read;
                let _ = stderr.read_to_string(&mut diagnostic);
            }
            return Err(AnalysisError::parse(
                &file,
                format!(
                    "parser exited with {}: {}",
                    status.code().unwrap_or(-1),
                    diagnostic.trim()
                ),
            ));
        }

        debug!(file, elapsed = ?started.elapsed(), "parser subprocess finished");
        Ok(std::fs::read_to_string(&output_path)?)
    }
}

impl EstreeParser for SubprocessParser {
    fn parse_file(
        &self,
        source_path: &Path,
        source_type: SourceType,
    ) -> AnalysisResult<SyntaxTree> {
        let json = self.run(source_path, source_type)?;
        ingest_json(&source_path.display().to_string(), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_parser(script: &str) -> SubprocessParser {
        SubprocessParser::new(ParserSelector {
            program: "sh".to_owned(),
            args: vec!["-c".to_owned(), script.to_owned(), "sh".to_owned()],
            timeout_seconds: 5,
        })
    }

    #[test]
    fn successful_subprocess_output_is_ingested() {
        // Writes a minimal Program document to the output path ($2).
        let parser = shell_parser(
            r#"printf '{"type":"Program","range":[0,0],"loc":{"start":{"line":1,"column":0},"end":{"line":1,"column":0}},"body":[]}' > "$2""#,
        );
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bg.js");
        std::fs::write(&source, "").unwrap();
        let tree = parser.parse_file(&source, SourceType::Script).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn nonzero_exit_becomes_a_parse_failure() {
        let parser = shell_parser(r#"echo "unexpected token" >&2; exit 3"#);
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bg.js");
        std::fs::write(&source, "let =;").unwrap();
        let err = parser.parse_file(&source, SourceType::Script).unwrap_err();
        assert!(matches!(err, AnalysisError::ParseFailure { .. }));
        assert!(err.to_string().contains("unexpected token"));
    }

    #[test]
    fn hung_subprocess_is_killed_at_the_timeout() {
        let mut parser = shell_parser("sleep 30");
        parser.selector.timeout_seconds = 1;
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bg.js");
        std::fs::write(&source, "").unwrap();
        let started = Instant::now();
        let err = parser.parse_file(&source, SourceType::Script).unwrap_err();
        assert!(matches!(err, AnalysisError::ParseFailure { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
