//! Operation-mode service over the device `appops` command.

use std::process::Command;
use vigil_core::platform::{AuthorityError, Mode, OpCode, OperationModeService};

const USER_UID_RANGE: u32 = 100_000;

pub struct AppOpsShell;

fn op_name(op: OpCode) -> &'static str {
    match op {
        OpCode::WakeLock => "WAKE_LOCK",
        OpCode::BootCompleted => "BOOT_COMPLETED",
    }
}

fn mode_word(mode: Mode) -> &'static str {
    match mode {
        Mode::Allowed => "allow",
        Mode::Ignored => "ignore",
        Mode::Errored => "deny",
    }
}

fn parse_mode(word: &str) -> Option<Mode> {
    match word {
        // An op left at its default is reported as "default"; both tracked
        // ops default to allowed.
        "allow" | "default" => Some(Mode::Allowed),
        "ignore" => Some(Mode::Ignored),
        "deny" => Some(Mode::Errored),
        _ => None,
    }
}

/// Output looks like `WAKE_LOCK: allow; time=+3d...` or `Default mode: allow`.
fn parse_get_output(op: OpCode, text: &str) -> Option<Mode> {
    text.lines().find_map(|line| {
        let (head, rest) = line.split_once(':')?;
        if head.trim() != op_name(op) && head.trim() != "Default mode" {
            return None;
        }
        let word = rest.trim().split([';', ' ']).next()?;
        parse_mode(word)
    })
}

fn run(args: &[&str]) -> Result<String, AuthorityError> {
    let output = Command::new("appops")
        .args(args)
        .output()
        .map_err(|err| AuthorityError::Unavailable(format!("appops spawn failed: {err:?}")))?;

    if !output.status.success() {
        return Err(AuthorityError::Unavailable(format!(
            "appops {} exited with {}",
            args.join(" "),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl OperationModeService for AppOpsShell {
    fn check_mode(&self, op: OpCode, uid: u32, package: &str) -> Result<Mode, AuthorityError> {
        let user = (uid / USER_UID_RANGE).to_string();
        let text = run(&["get", "--user", &user, package, op_name(op)])?;

        parse_get_output(op, &text).ok_or_else(|| {
            AuthorityError::Unavailable(format!("unparseable appops output: {text:?}"))
        })
    }

    fn set_mode(
        &self,
        op: OpCode,
        uid: u32,
        package: &str,
        mode: Mode,
    ) -> Result<(), AuthorityError> {
        let user = (uid / USER_UID_RANGE).to_string();
        run(&[
            "set",
            "--user",
            &user,
            package,
            op_name(op),
            mode_word(mode),
        ])?;
        Ok(())
    }
}
