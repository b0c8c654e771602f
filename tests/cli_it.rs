use std::process::Command;

use sendfile::Result;

fn run(args: &[&str]) -> Result<std::process::Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_sendfile")).args(args).output()?)
}

#[test]
fn test_bad_offset_names_option() -> Result<()> {
    let output = run(&["send", "--offset", "abc", "Cargo.toml", "127.0.0.1:1"])?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("--offset: "), "stderr: {}", stderr);

    Ok(())
}

#[test]
fn test_bad_chunk_size_names_option() -> Result<()> {
    let output = run(&["send", "--chunk-size", "12X", "Cargo.toml", "127.0.0.1:1"])?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("--chunk-size: "), "stderr: {}", stderr);

    Ok(())
}

#[test]
fn test_info() -> Result<()> {
    let output = run(&["info"])?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(sendfile::CAPABILITY.name()), "stdout: {}", stdout);

    Ok(())
}
