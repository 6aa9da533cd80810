//! Scripted in-memory engines for pool tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Notify;
use usi_client::{EngineLauncher, EngineSession, Result};

/// Canned replies of a scripted engine.
#[derive(Clone)]
pub struct Script {
    pub name: String,
    pub search_output: Vec<String>,
    pub mate_output: Option<String>,
}

impl Script {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            search_output: vec![
                "info depth 10 score cp 35 nodes 1000 multipv 1 pv 7g7f 3c3d".to_string(),
                "bestmove 7g7f ponder 3c3d".to_string(),
            ],
            mate_output: Some("checkmate nomate".to_string()),
        }
    }

    pub fn with_search_output(mut self, lines: &[&str]) -> Self {
        self.search_output = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_mate_output(mut self, line: Option<&str>) -> Self {
        self.mate_output = line.map(str::to_string);
        self
    }

    fn reply(&self, command: &str) -> Vec<String> {
        if command == "usi" {
            return vec![
                format!("id name {}", self.name),
                "id author Tests".to_string(),
                "usiok".to_string(),
            ];
        }
        if command == "isready" {
            return vec!["readyok".to_string()];
        }
        if command.starts_with("go mate") {
            return self.mate_output.clone().into_iter().collect();
        }
        if command.starts_with("go") {
            return self.search_output.clone();
        }
        Vec::new()
    }
}

/// Launcher for scripted engines. Records every command each engine receives
/// and can make an engine exit on demand.
pub struct ScriptedLauncher {
    script: Script,
    pub commands: Arc<Mutex<Vec<String>>>,
    kill_switches: Mutex<Vec<Arc<Notify>>>,
}

impl ScriptedLauncher {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            commands: Arc::new(Mutex::new(Vec::new())),
            kill_switches: Mutex::new(Vec::new()),
        }
    }

    /// Make the `index`-th launched engine exit.
    pub fn kill(&self, index: usize) {
        self.kill_switches.lock().unwrap()[index].notify_one();
    }

    pub fn received(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<EngineSession> {
        let (client, engine) = tokio::io::duplex(16 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (engine_read, mut engine_write) = tokio::io::split(engine);

        let script = self.script.clone();
        let commands = Arc::clone(&self.commands);
        let kill = Arc::new(Notify::new());
        self.kill_switches.lock().unwrap().push(Arc::clone(&kill));

        tokio::spawn(async move {
            let mut lines = BufReader::new(engine_read).lines();
            loop {
                let line = tokio::select! {
                    _ = kill.notified() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => line,
                        _ => break,
                    },
                };
                commands.lock().unwrap().push(line.clone());
                if line == "quit" {
                    break;
                }
                for reply in script.reply(&line) {
                    if engine_write.write_all(format!("{}\n", reply).as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(EngineSession::from_io(client_read, client_write))
    }
}
