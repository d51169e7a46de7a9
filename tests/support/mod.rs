#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use ccli::cluster::{ClusterClient, ClusterFlavor, CommandOutput, CommandRunner};
use ccli::codec::encoding::encode;
use ccli::codec::CredentialResource;
use ccli::models::Id;
use ccli::remote::CryptopusClient;
use ccli::session::SessionData;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Answers cluster commands from a table and records what was run.
///
/// Files passed with `-f` are read at call time so tests can inspect what
/// would have been handed to the cluster.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
    files: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Installed and logged in as `flavor`.
    pub fn logged_in(flavor: ClusterFlavor) -> Self {
        let binary = flavor.binary();
        Self::default()
            .respond(
                &format!("which {binary}"),
                CommandOutput::ok(format!("/usr/bin/{binary}")),
            )
            .respond(
                &format!("{binary} {}", flavor.auth_probe().join(" ")),
                CommandOutput::ok(""),
            )
    }

    pub fn respond(mut self, command: &str, output: CommandOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<String> {
        self.files.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let line = format!("{program} {}", args.join(" "));
        self.calls.lock().unwrap().push(line.clone());

        if let Some(pos) = args.iter().position(|a| a == "-f") {
            if let Some(content) = args.get(pos + 1).and_then(|p| std::fs::read_to_string(p).ok()) {
                self.files.lock().unwrap().push(content);
            }
        }

        Ok(self
            .responses
            .get(&line)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failed(format!("unexpected command: {line}"))))
    }
}

pub fn oc(runner: ScriptedRunner, tmp_dir: &std::path::Path) -> ClusterClient<ScriptedRunner> {
    ClusterClient::with_runner(ClusterFlavor::OpenShift, runner).with_tmp_dir(tmp_dir)
}

pub fn session(url: &str, folder: Option<u64>) -> SessionData {
    SessionData {
        url: Some(url.to_string()),
        username: Some("bob".to_string()),
        token: Some("1234".to_string()),
        folder: folder.map(Id::from),
    }
}

/// Client for the mock server, with `folder` selected.
pub fn remote(server: &MockServer, folder: Option<u64>) -> CryptopusClient {
    CryptopusClient::from_session(
        &session(&server.uri(), folder),
        CredentialResource::Encryptables,
    )
    .unwrap()
}

/// The header value the server expects for the `1234` test token.
pub fn password_header() -> String {
    encode("1234")
}

pub fn encryptable(id: u64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "type": "encryptables",
        "attributes": {
            "name": name,
            "type": "credentials",
            "cleartext_username": "admin",
            "cleartext_password": "hunter2"
        }
    })
}

pub fn encryptable_with_secret(id: u64, name: &str, yaml: &str) -> Value {
    json!({
        "id": id.to_string(),
        "type": "encryptables",
        "attributes": {
            "name": name,
            "type": "ose_secret",
            "cleartext_ose_secret": yaml
        }
    })
}

pub fn folder_body(id: u64, name: &str, records: Vec<Value>) -> Value {
    json!({
        "data": {
            "id": id.to_string(),
            "type": "folders",
            "attributes": { "name": name }
        },
        "included": records
    })
}

pub fn record_body(record: Value) -> Value {
    json!({ "data": record })
}

pub fn secret_yaml(name: &str, token: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Secret\ntype: Opaque\nmetadata:\n  name: {name}\n  namespace: project\n  uid: 0c1e\ndata:\n  token: {}\n",
        encode(token)
    )
}
