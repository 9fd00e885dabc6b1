#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use tempfile::TempDir;

// Every script is written before any test spawns a child. Writing an
// executable while another thread forks can fail the later exec with ETXTBSY.
static FIXTURES: Lazy<TempDir> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("create fixture dir");
    for (name, body) in SCRIPTS {
        let path = dir.path().join(name);
        fs::write(&path, body).expect("write fixture script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fixture script");
    }
    let plain = dir.path().join("not_executable.sh");
    fs::write(&plain, "#!/bin/sh\necho '{\"result\": 1}'\n").expect("write plain file");
    fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).expect("chmod plain file");
    dir
});

const SCRIPTS: &[(&str, &str)] = &[
    (
        "noise_then_response.sh",
        "#!/bin/sh\nread -r request\necho noise\necho '{\"result\": {\"ok\": true}}'\n",
    ),
    ("echo_x.sh", "#!/bin/sh\nread -r request\necho '{\"result\": {\"x\": 1}}'\n"),
    (
        "raw_text.sh",
        "#!/bin/sh\nread -r request\nprintf 'plain text output\\nsecond line\\n'\n",
    ),
    // Mirrors the request to stdout and stderr
    (
        "mirror.sh",
        "#!/bin/sh\nread -r request\nprintf '%s\\n' \"$request\"\nprintf '%s\\n' \"$request\" >&2\n",
    ),
    // Never reads stdin and never exits on its own
    ("sleeper.sh", "#!/bin/sh\necho 'partial output'\nexec sleep 30\n"),
    // Answers and exits without reading the request
    ("no_read.sh", "#!/bin/sh\necho '{\"result\": \"early\"}'\n"),
    // Fills the stderr pipe well past its capacity before reading the request
    (
        "flood.sh",
        concat!(
            "#!/bin/sh\ni=0\nwhile [ $i -lt 4000 ]; do\n",
            "  echo \"diagnostic line $i padding padding padding padding padding\" >&2\n",
            "  i=$((i+1))\ndone\nread -r request\necho '{\"result\": \"survived\"}'\n",
        ),
    ),
    // Wrapper that forks the real work and waits on it; prints the forked PID
    ("forking_wrapper.sh", "#!/bin/sh\nsleep 30 &\necho \"$!\"\nwait\n"),
    (
        "env_echo.sh",
        "#!/bin/sh\nread -r request\nprintf '{\"result\": {\"token\": \"%s\"}}\\n' \"$SMOKE_TOKEN\"\n",
    ),
    ("exit_status.sh", "#!/bin/sh\nread -r request\necho '{\"error\": {\"code\": -32601}}'\nexit 3\n"),
];

pub fn fixture(name: &str) -> PathBuf {
    let path = FIXTURES.path().join(name);
    assert!(path.exists(), "unknown fixture {}", name);
    path
}

/// A path that is guaranteed not to exist
pub fn missing_executable() -> PathBuf {
    FIXTURES.path().join("does-not-exist")
}
