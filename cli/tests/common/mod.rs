#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub fn exec_cmd(path: impl AsRef<Path>, cmd: &str, args: &[&str]) -> Result<String, anyhow::Error> {
    let output = Command::new(cmd)
        .current_dir(path)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;

    match output.status.success() {
        false => Err(anyhow::anyhow!(stderr)),
        true => Ok(stdout),
    }
}

/// fresh `target/tmp/<name>` directory
pub fn create_test_dir(name: &str) -> PathBuf {
    let path = env::current_dir()
        .unwrap()
        .join("target")
        .join("tmp")
        .join(name);
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}

/// Bare repository `<root>/remotes/<name>.git` with `main` and `branches`.
pub fn create_remote(root: &Path, name: &str, branches: &[&str]) -> PathBuf {
    let seed = root.join("seeds").join(name);
    std::fs::create_dir_all(&seed).unwrap();
    exec_cmd(&seed, "git", &["init", "-b", "main"]).unwrap();
    std::fs::write(seed.join("README.md"), name).unwrap();
    commit(&seed, "init");

    for branch in branches {
        exec_cmd(&seed, "git", &["checkout", "-b", branch]).unwrap();
        std::fs::write(seed.join(format!("{}.txt", branch)), branch).unwrap();
        commit(&seed, branch);
        exec_cmd(&seed, "git", &["checkout", "main"]).unwrap();
    }

    let remotes = root.join("remotes");
    std::fs::create_dir_all(&remotes).unwrap();
    let bare = remotes.join(format!("{}.git", name));
    exec_cmd(
        &remotes,
        "git",
        &["clone", "--bare", seed.to_str().unwrap(), bare.to_str().unwrap()],
    )
    .unwrap();
    bare
}

fn commit(path: &Path, message: &str) {
    exec_cmd(path, "git", &["add", "-A"]).unwrap();
    exec_cmd(
        path,
        "git",
        &["-c", "user.name=pdl", "-c", "user.email=pdl@example.com", "commit", "-m", message],
    )
    .unwrap();
}

/// Write `catalog.toml` and `settings.toml` under `root`, downloads go to `<root>/workspace`.
pub fn create_workspace(root: &Path, projects: &[(&str, &Path)]) {
    let mut catalog = String::new();
    for (name, remote) in projects {
        catalog += &format!(
            "[[project]]\nname = \"{}\"\n[project.remotes]\nlocal = '{}'\n\n",
            name,
            remote.display()
        );
    }
    std::fs::write(root.join("catalog.toml"), catalog).unwrap();

    let settings = format!(
        "source = \"local\"\nsave-path = '{}'\nthreads = 2\n",
        root.join("workspace").display()
    );
    std::fs::write(root.join("settings.toml"), settings).unwrap();
}

/// `pdl --catalog <root>/catalog.toml --config <root>/settings.toml <args>`
pub fn pdl(root: &Path, args: &[&str]) -> Command {
    let mut command = Command::cargo_bin("pdl").unwrap();
    command
        .env("HOME", root)
        .arg("--catalog")
        .arg(root.join("catalog.toml"))
        .arg("--config")
        .arg(root.join("settings.toml"))
        .args(args);
    command
}
