use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

/// Reads the one-off password used to encrypt or decrypt a transfer file.
///
/// Order: environment variable, piped stdin, interactive prompt.
///
///   KEYHAVEN_TRANSFER_PASSWORD="pw" keyhaven import --encrypted keys.json
///   echo "pw" | keyhaven import --encrypted keys.json
pub fn read_transfer_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("KEYHAVEN_TRANSFER_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;
        trim_newline(&mut buf);
        if !buf.is_empty() {
            return Ok(buf);
        }
    }

    if io::stdin().is_terminal() {
        let pw = rpassword::prompt_password("Transfer password: ")?;
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    bail!("no password provided")
}

/// Reads a new vault password, with confirmation when interactive.
///
/// Non-interactive input takes the environment variable, or two identical
/// lines on stdin.
pub fn read_new_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("KEYHAVEN_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    if !io::stdin().is_terminal() {
        let stdin = io::stdin();
        let mut handle = stdin.lock();

        let mut pw1 = Zeroizing::new(String::new());
        let mut pw2 = Zeroizing::new(String::new());
        handle.read_line(&mut pw1)?;
        handle.read_line(&mut pw2)?;
        trim_newline(&mut pw1);
        trim_newline(&mut pw2);

        if pw1.is_empty() {
            bail!("password cannot be empty");
        }
        if pw1 != pw2 {
            bail!("passwords do not match");
        }
        return Ok(pw1);
    }

    let pw1 = rpassword::prompt_password("New password: ")?;
    let pw2 = rpassword::prompt_password("Confirm password: ")?;

    if pw1.is_empty() {
        bail!("password cannot be empty");
    }
    if pw1 != pw2 {
        bail!("passwords do not match");
    }

    Ok(Zeroizing::new(pw1))
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
