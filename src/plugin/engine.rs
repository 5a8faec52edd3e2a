//! Script execution for plugins
//!
//! Every invocation runs in a fresh interpreter process: plugin sources are
//! loaded, then `BPM_PLUGIN[entry](...args)` is called and its string result
//! is read back from stdout.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{BpmError, Result, build};

/// Plugin sources, loaded once per plugin and reused for every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginScript {
    pub plugin: String,
    /// `(path, source)` in load order
    pub sources: Vec<(PathBuf, String)>,
}

impl PluginScript {
    /// Driver program calling `entry` with JSON-encoded `args`
    pub fn driver(&self, entry: &str, args: &[serde_json::Value]) -> Result<String> {
        let entry_json = serde_json::to_string(entry)?;
        let args_json = serde_json::to_string(args)?;

        let mut program = String::from("var BPM_PLUGIN = {};\n");
        for (path, source) in &self.sources {
            program.push_str(&format!("// {}\n", path.display()));
            program.push_str(source);
            if !source.ends_with('\n') {
                program.push('\n');
            }
        }
        program.push_str(&format!(
            concat!(
                ";(function () {{\n",
                "  var entry = {entry};\n",
                "  var fn = BPM_PLUGIN[entry];\n",
                "  if (typeof fn !== 'function') {{\n",
                "    process.stderr.write('plugin does not define ' + entry);\n",
                "    process.exit(3);\n",
                "  }}\n",
                "  var result = fn.apply(BPM_PLUGIN, {args});\n",
                "  process.stdout.write(String(result));\n",
                "}})();\n"
            ),
            entry = entry_json,
            args = args_json,
        ));
        Ok(program)
    }
}

/// Capability to run a plugin entry point in an isolated context
pub trait ScriptEngine: Send + Sync {
    fn invoke(&self, script: &PluginScript, entry: &str, args: &[serde_json::Value])
    -> Result<String>;
}

/// Runs plugins with an external interpreter, one process per call
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    timeout: Duration,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl ScriptEngine for ProcessEngine {
    fn invoke(
        &self,
        script: &PluginScript,
        entry: &str,
        args: &[serde_json::Value],
    ) -> Result<String> {
        let driver = script.driver(entry, args)?;
        let plugin = script.plugin.as_str();

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                build::plugin_failed(plugin, format!("failed to start '{}': {e}", self.program))
            })?;

        let stdin = child.stdin.take();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                let _ = stdin.write_all(driver.as_bytes());
            }
        });
        let stdout_reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(BpmError::PluginTimeout {
                            plugin: plugin.to_string(),
                            seconds: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(build::plugin_failed(plugin, format!("wait error: {e}"))),
            }
        };

        let _ = writer.join();
        let stdout = stdout_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let message = String::from_utf8_lossy(&stderr).trim().to_string();
            let reason = if message.is_empty() {
                format!("exited with {status}")
            } else {
                message
            };
            return Err(build::plugin_failed(plugin, reason));
        }

        String::from_utf8(stdout)
            .map_err(|_| build::plugin_failed(plugin, "output is not valid UTF-8"))
    }
}
