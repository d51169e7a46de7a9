use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::codec::{parse_secret, split_list};
use crate::error::{Error, Result};

use super::{
    check_secret_name, ClusterFlavor, CommandOutput, CommandRunner, FetchedSecret, SecretSink,
    SecretSource, SystemCommandRunner,
};

/// Secret CRUD against a cluster through its CLI binary.
///
/// Every public operation first checks that the binary is installed and then
/// that it is logged in, failing fast on either. Upserts are a delete (that
/// tolerates a missing object) followed by a create from a file, so a failure
/// between the two leaves the secret absent.
pub struct ClusterClient<R = SystemCommandRunner> {
    flavor: ClusterFlavor,
    runner: R,
    sync_label: Option<String>,
    tmp_dir: PathBuf,
}

impl ClusterClient {
    pub fn new(flavor: ClusterFlavor) -> Self {
        Self::with_runner(flavor, SystemCommandRunner)
    }
}

impl<R: CommandRunner> ClusterClient<R> {
    pub fn with_runner(flavor: ClusterFlavor, runner: R) -> Self {
        Self {
            flavor,
            runner,
            sync_label: None,
            tmp_dir: std::env::temp_dir(),
        }
    }

    /// Restrict listing and lookups to secrets labelled `<label>=true`.
    pub fn with_sync_label(mut self, label: Option<String>) -> Self {
        self.sync_label = label;
        self
    }

    /// Directory the upsert documents are written to.
    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn flavor(&self) -> ClusterFlavor {
        self.flavor
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn is_client_installed(&self) -> Result<()> {
        let installed = self
            .runner
            .run("which", &[self.flavor.binary().to_string()])
            .map(|output| output.success)
            .unwrap_or(false);

        if installed {
            Ok(())
        } else {
            Err(Error::ClusterClientMissing {
                flavor: self.flavor,
            })
        }
    }

    pub fn is_authenticated(&self) -> Result<()> {
        let probe = self.flavor.auth_probe().iter().map(|s| s.to_string()).collect();
        if self.run(probe)?.success {
            Ok(())
        } else {
            Err(Error::ClusterClientNotLoggedIn {
                flavor: self.flavor,
            })
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        self.is_client_installed()?;
        self.is_authenticated()
    }

    /// Names of all visible secrets, in the order the cluster lists them.
    pub fn list_secret_names(&self) -> Result<Vec<String>> {
        self.ensure_ready()?;
        self.secret_names()
    }

    fn secret_names(&self) -> Result<Vec<String>> {
        let mut args = args(&[
            "get",
            "secret",
            "-o",
            "custom-columns=NAME:metadata.name",
            "--no-headers=true",
        ]);
        args.extend(self.label_selector());

        let stdout = self.run_checked(args)?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn get_secret(&self, name: &str) -> Result<String> {
        let not_found = || Error::ClusterSecretNotFound {
            location: self.flavor.label().to_string(),
            name: name.to_string(),
        };

        if self.sync_label.is_none() {
            let output = self.run(args(&["get", "-o", "yaml", "secret", name]))?;
            if !output.success {
                return Err(not_found());
            }
            return Ok(output.stdout);
        }

        let mut args = args(&["get", "-o", "yaml", "secret"]);
        args.push(format!("--field-selector=metadata.name={name}"));
        args.extend(self.label_selector());

        let output = self.run(args)?;
        if !output.success {
            return Err(not_found());
        }
        split_list(&output.stdout)?
            .into_iter()
            .next()
            .ok_or_else(not_found)
    }

    fn get_all_secrets(&self) -> Result<Vec<FetchedSecret>> {
        if self.sync_label.is_none() {
            // A secret deleted after listing only fails its own entry.
            return Ok(self
                .secret_names()?
                .into_iter()
                .map(|name| {
                    let yaml = self.get_secret(&name);
                    FetchedSecret { name, yaml }
                })
                .collect());
        }

        let mut args = args(&["get", "secret", "-o", "yaml"]);
        args.extend(self.label_selector());
        Ok(split_list(&self.run_checked(args)?)?
            .into_iter()
            .enumerate()
            .map(|(index, yaml)| FetchedSecret {
                name: parse_secret(&yaml)
                    .map(|s| s.name)
                    .unwrap_or_else(|_| format!("#{}", index + 1)),
                yaml: Ok(yaml),
            })
            .collect())
    }

    fn put_secret(&self, name: &str, yaml: &str) -> Result<()> {
        check_secret_name(name)?;
        let path = self.tmp_dir.join(format!("{name}.yml"));
        std::fs::write(&path, yaml)?;

        let file = path.display().to_string();
        self.run_checked(vec![
            "delete".to_string(),
            "-f".to_string(),
            file.clone(),
            "--ignore-not-found=true".to_string(),
        ])?;
        self.run_checked(vec!["create".to_string(), "-f".to_string(), file])?;

        info!(secret = name, client = self.flavor.binary(), "Secret written to cluster");
        remove_quietly(&path);
        Ok(())
    }

    fn label_selector(&self) -> Vec<String> {
        match &self.sync_label {
            Some(label) => vec!["-l".to_string(), format!("{label}=true")],
            None => Vec::new(),
        }
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.flavor.binary(), args.join(" "))
    }

    fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        debug!(command = %self.command_line(&args), "Running cluster command");
        self.runner
            .run(self.flavor.binary(), &args)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => Error::ClusterClientMissing {
                    flavor: self.flavor,
                },
                _ => Error::ClusterCommand {
                    command: self.command_line(&args),
                    stderr: err.to_string(),
                },
            })
    }

    fn run_checked(&self, args: Vec<String>) -> Result<String> {
        let command = self.command_line(&args);
        let output = self.run(args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(Error::ClusterCommand {
                command,
                stderr: output.stderr,
            })
        }
    }
}

#[async_trait]
impl<R: CommandRunner> SecretSource for ClusterClient<R> {
    async fn fetch_secret(&self, name: &str) -> Result<String> {
        self.ensure_ready()?;
        self.get_secret(name)
    }

    async fn fetch_all_secrets(&self) -> Result<Vec<FetchedSecret>> {
        self.ensure_ready()?;
        self.get_all_secrets()
    }
}

#[async_trait]
impl<R: CommandRunner> SecretSink for ClusterClient<R> {
    async fn insert_secret(&self, name: &str, yaml: &str) -> Result<()> {
        self.ensure_ready()?;
        self.put_secret(name, yaml)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn remove_quietly(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        debug!(path = %path.display(), error = %err, "Could not remove upsert file");
    }
}
