// Remote deployment: one SFTP transfer, then one st-flash run on the
// flashing host. The two sessions are scoped independently, exactly like
// the upload pipeline this replaces; there is no retry and no timeout.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ssh2::{CheckResult, KnownHostFileKind, Session};
use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ServerConfig;

/// Fixed landing spot on the flashing host. Uploads for different build
/// variants overwrite the same file.
pub const REMOTE_FIRMWARE_PATH: &str = "/home/pi/firmware.bin";

/// Start of flash memory on the STM32F042.
pub const FLASH_BASE_ADDRESS: &str = "0x08000000";

/// Local build output for a variant, e.g. `.pioenvs/nucleo_f042k6_lora/firmware.bin`.
pub fn firmware_path(env_dir: &Path, variant: &str) -> PathBuf {
    env_dir
        .join(format!("nucleo_f042k6_{variant}"))
        .join("firmware.bin")
}

/// A single upload-then-flash sequence against one host.
///
/// Both steps run inside `run()` so a later transactional variant (verify
/// the upload before flashing) can slot in without touching callers.
pub struct Deployment {
    config: ServerConfig,
    local_path: PathBuf,
    remote_path: String,
}

impl Deployment {
    pub fn new(config: ServerConfig, local_path: PathBuf) -> Self {
        Self {
            config,
            local_path,
            remote_path: REMOTE_FIRMWARE_PATH.to_string(),
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// Uploads the firmware and triggers the remote flash. Returns the
    /// captured st-flash output. A failure while connecting or uploading
    /// aborts before the flash is attempted; the flash command's exit
    /// status is surfaced but not acted on.
    pub fn run(&self) -> Result<String> {
        if !self.local_path.exists() {
            bail!(
                "firmware not found: {} (build this variant first)",
                self.local_path.display()
            );
        }

        {
            let session = self.connect().context("establishing SFTP session")?;
            self.upload(&session)?;
        }
        println!("{}", "UPLOAD COMPLETED!!".green());

        let session = self.connect().context("establishing shell session")?;
        let output = self.flash(&session)?;
        print!("{output}");
        println!("{}", "FLASH COMPLETED!!".green());
        Ok(output)
    }

    fn connect(&self) -> Result<Session> {
        let tcp = TcpStream::connect((self.config.host.as_str(), self.config.port))
            .with_context(|| {
                format!("connecting to {}:{}", self.config.host, self.config.port)
            })?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake().context("SSH handshake")?;

        if !self.config.accept_unknown_host_key {
            self.verify_host_key(&session)?;
        }

        session
            .userauth_password(&self.config.username, &self.config.password)
            .with_context(|| {
                format!(
                    "authenticating as {}@{}",
                    self.config.username, self.config.host
                )
            })?;
        Ok(session)
    }

    fn verify_host_key(&self, session: &Session) -> Result<()> {
        let (key, _) = session
            .host_key()
            .context("server offered no host key")?;
        let mut known_hosts = session.known_hosts()?;
        let path = known_hosts_path()?;
        known_hosts
            .read_file(&path, KnownHostFileKind::OpenSSH)
            .with_context(|| format!("reading {}", path.display()))?;

        match known_hosts.check_port(&self.config.host, self.config.port, key) {
            CheckResult::Match => Ok(()),
            CheckResult::Mismatch => bail!(
                "host key for {} does not match {}",
                self.config.host,
                path.display()
            ),
            CheckResult::NotFound => bail!(
                "{} is not in {}; connect once with ssh first, or set accept_unknown_host_key in the server config",
                self.config.host,
                path.display()
            ),
            CheckResult::Failure => bail!("host key check failed for {}", self.config.host),
        }
    }

    fn upload(&self, session: &Session) -> Result<()> {
        let mut local = File::open(&self.local_path)
            .with_context(|| format!("opening {}", self.local_path.display()))?;
        let size = local.metadata()?.len();
        info!(size, firmware = %self.local_path.display(), "uploading firmware");
        println!(
            "   Firmware: {} bytes ({:.2} KB)",
            size,
            size as f64 / 1024.0
        );

        let sftp = session.sftp().context("opening SFTP subsystem")?;
        let mut remote = sftp
            .create(Path::new(&self.remote_path))
            .with_context(|| {
                format!("creating {} on {}", self.remote_path, self.config.host)
            })?;

        let pb = ProgressBar::new(size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}")?
                .progress_chars("#>-"),
        );

        let mut buf = [0u8; 32 * 1024];
        loop {
            let n = local
                .read(&mut buf)
                .with_context(|| format!("reading {}", self.local_path.display()))?;
            if n == 0 {
                break;
            }
            remote
                .write_all(&buf[..n])
                .with_context(|| format!("writing {}", self.remote_path))?;
            pb.inc(n as u64);
        }
        pb.finish_and_clear();
        Ok(())
    }

    fn flash(&self, session: &Session) -> Result<String> {
        let command = format!(
            "st-flash write {} {}",
            self.remote_path, FLASH_BASE_ADDRESS
        );
        debug!(%command, "running flash command");

        let mut channel = session.channel_session().context("opening exec channel")?;
        channel
            .exec(&command)
            .with_context(|| format!("running {command:?}"))?;

        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .context("reading flash output")?;
        // st-flash writes its progress to stderr
        channel
            .stderr()
            .read_to_string(&mut output)
            .context("reading flash output")?;
        channel.wait_close()?;

        let status = channel.exit_status()?;
        debug!(status, "flash command finished");
        Ok(output)
    }
}

fn known_hosts_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".ssh").join("known_hosts"))
}
