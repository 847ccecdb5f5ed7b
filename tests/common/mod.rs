//! Shared fixtures: fake runtimes, payload archives and probes.
#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use pkm_bootstrap::libs::bootstrap_run::{InstallRequest, PayloadRequest};
use pkm_bootstrap::libs::host_probe::StaticProbe;
use pkm_bootstrap::libs::payload_source::{Payload, PayloadSource};
use pkm_bootstrap::libs::utilities::file_operations::make_executable;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Writes an executable shell script.
pub fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
    make_executable(path).unwrap();
}

/// A PATH directory holding a `python3` that exits with `exit_code`.
pub fn runtime_bin(root: &Path, exit_code: i32) -> PathBuf {
    let bin = root.join("runtime-bin");
    write_script(&bin.join("python3"), &format!("#!/bin/sh\nexit {exit_code}\n"));
    bin
}

/// A probe reporting `version` for a runtime on a PATH made of `runtime_bin` only.
pub fn probe(root: &Path, version: &str) -> StaticProbe {
    let mut probe = StaticProbe::new();
    probe.search_path = vec![runtime_bin(root, 0)];
    probe.runtime_version = Some(version.to_string());
    probe
}

fn manifest(version: &str) -> String {
    format!("name = \"pkm\"\nversion = \"{version}\"\nentry = \"pkm/__main__.py\"\nruntime_args = [\"-I\"]\n")
}

/// A release-style archive: everything wrapped in `pkm-<version>/`.
pub fn payload_archive(dir: &Path, version: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("pkm-{version}.tar.gz"));
    let file = File::create(&path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let entries = [
        (format!("pkm-{version}/pkm-payload.toml"), manifest(version)),
        (
            format!("pkm-{version}/pkm/__main__.py"),
            format!("print('pkm {version}')\n"),
        ),
    ];
    for (name, body) in &entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, body.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
    path
}

/// A delegated install of `pkm-<version>.tar.gz`, as `pip` would hand it over.
pub fn delegated_request(dir: &Path, version: &str) -> InstallRequest {
    let archive = payload_archive(dir, version);
    InstallRequest {
        payload: PayloadRequest::Local(Payload::delegated(PayloadSource::Archive(archive), "pip").unwrap()),
        force: false,
    }
}

/// Names of entries directly inside `dir`, sorted.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(read) => read
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
