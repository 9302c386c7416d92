use super::{DeployError, DeployLog, DeployOutcome, DeployTimer, Deployer};
use crate::{
    checks::digest::DirectoryDigest,
    state::{DeployRecord, RemoteInfo},
};
use duct_sh::sh_dangerous;
use log::{debug, error, info, trace};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Deploys to Netlify with the CLI, if nothing else is configured.
pub const DEFAULT_DEPLOY_COMMAND: &str =
    r#"netlify deploy --prod --json --dir "$SYNCBAR_DEPLOY_DIR" --site "$SYNCBAR_SITE_ID""#;

/// A deployer running a custom shell command.
///
/// The files in the digest are copied to a temporary staging directory first,
/// so ignored files are never uploaded, even if the command would pick them up.
/// The command runs in a subshell with these variables set:
///   - `SYNCBAR_SITE_ID` and `NETLIFY_SITE_ID`: the site to deploy to,
///   - `SYNCBAR_SOURCE_DIR`: the watched directory,
///   - `SYNCBAR_DEPLOY_DIR`: the staging directory to upload,
///   - `NETLIFY_AUTH_TOKEN`: the token, if there is one.
///
/// Every line of the output is a progress event, except a trailing JSON object,
/// which is read as the result of the deploy.
pub struct ScriptDeployer {
    directory: PathBuf,
    site_id: String,
    command: String,
    token: Option<String>,
}

impl ScriptDeployer {
    /// Creates a new deployer for the directory and site.
    pub fn new(directory: PathBuf, site_id: String, command: String, token: Option<String>) -> Self {
        ScriptDeployer {
            directory,
            site_id,
            command,
            token,
        }
    }

    fn stage(&self, digest: &DirectoryDigest) -> Result<TempDir, DeployError> {
        let staging = tempfile::Builder::new()
            .prefix("syncbar-deploy-")
            .tempdir()
            .map_err(|err| DeployError::Staging(String::from("a temporary directory"), err))?;

        for path in digest.paths() {
            let source = DirectoryDigest::resolve(&self.directory, path);
            let target = DirectoryDigest::resolve(staging.path(), path);
            let staging_error = |err| DeployError::Staging(source.display().to_string(), err);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(staging_error)?;
            }
            fs::copy(&source, &target).map_err(staging_error)?;
        }
        trace!("Staged {} files in {}.", digest.len(), staging.path().display());

        Ok(staging)
    }

    fn run_command(&self, staging: &Path) -> Result<String, DeployError> {
        // We can run `sh_dangerous`, because the command comes from the user's own config.
        let mut command = sh_dangerous(&self.command)
            .env("CI", "true")
            .env("SYNCBAR_SITE_ID", &self.site_id)
            .env("SYNCBAR_SOURCE_DIR", &self.directory)
            .env("SYNCBAR_DEPLOY_DIR", staging)
            .env("NETLIFY_SITE_ID", &self.site_id);
        if let Some(token) = &self.token {
            command = command.env("NETLIFY_AUTH_TOKEN", token);
        }

        let output = command
            .stderr_to_stdout()
            .stdout_capture()
            .dir(&self.directory)
            .unchecked()
            .run()?;

        let output_str =
            std::str::from_utf8(&output.stdout).map_err(|_| DeployError::NonUtf8Return)?;
        let output_str = output_str.trim_end().to_string();

        if output.status.success() {
            Ok(output_str)
        } else {
            Err(DeployError::NonZeroExitcode(
                output.status.code().unwrap_or(-1),
                output_str,
            ))
        }
    }

    fn run_inner(
        &self,
        digest: &DirectoryDigest,
        log: &mut DeployLog,
    ) -> Result<DeployOutcome, DeployError> {
        let staging = self.stage(digest)?;
        let output = self.run_command(staging.path())?;

        let (events, result) = split_output(&output);
        for event in events {
            debug!("{event}");
            log.push(event);
        }

        Ok(result.map(|result| outcome(&result)).unwrap_or_default())
    }
}

impl Deployer for ScriptDeployer {
    /// Stage the files and run the deploy command on them.
    fn deploy(&self, digest: &DirectoryDigest, changed_files: usize) -> DeployRecord {
        info!(
            "Deploying {} files from {} to {}.",
            digest.len(),
            self.directory.display(),
            self.site_id
        );

        let timer = DeployTimer::start();
        let mut log = DeployLog::default();
        let result = self.run_inner(digest, &mut log);
        if let Err(err) = &result {
            error!("Deploy failed: {err}.");
        }

        let record = timer.finish(log, result, changed_files);
        if !record.is_failed() {
            info!(
                "Deployed {} files in {:.1}s.",
                record.changed_file_count, record.duration_seconds
            );
        }

        record
    }
}

/// Split the output into progress events and the JSON result at the end.
fn split_output(output: &str) -> (Vec<&str>, Option<Map<String, Value>>) {
    let lines: Vec<&str> = output.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        if !line.trim_start().starts_with('{') {
            continue;
        }
        let rest = lines[index..].join("\n");
        if let Ok(Value::Object(result)) = serde_json::from_str::<Value>(&rest) {
            return (events(&lines[..index]), Some(result));
        }
    }

    (events(&lines), None)
}

fn events<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect()
}

fn outcome(result: &Map<String, Value>) -> DeployOutcome {
    let text = |key: &str| result.get(key).and_then(Value::as_str).map(String::from);

    let deploy_id = text("deploy_id").or_else(|| text("id"));
    let url = match (text("admin_url"), &deploy_id) {
        (Some(admin_url), Some(id)) => Some(format!(
            "{}/deploys/{id}",
            admin_url.trim_end_matches('/')
        )),
        (Some(admin_url), None) => Some(admin_url),
        (None, _) => text("logs").or_else(|| text("deploy_url")),
    };
    let remote_info = if deploy_id.is_some() || url.is_some() {
        Some(RemoteInfo { deploy_id, url })
    } else {
        None
    };

    let uploaded = result
        .get("changes")
        .and_then(Value::as_u64)
        .map(|changes| changes as usize)
        .or_else(|| result.get("uploadList").and_then(Value::as_array).map(Vec::len));

    DeployOutcome {
        remote_info,
        uploaded,
    }
}
