// common.rs — console output and error reporting shared by the engine crates

use parking_lot::Mutex;

use crate::q_shared::{ERR_DROP, ERR_FATAL};

pub const MAXPRINTMSG: usize = 4096;

// ============================================================
// Output capture
// ============================================================

static RD_BUFFER: Mutex<Option<String>> = Mutex::new(None);

/// Capture `com_printf` output until `com_end_redirect`.
pub fn com_begin_redirect() {
    *RD_BUFFER.lock() = Some(String::new());
}

/// Stop capturing and hand back what was printed.
pub fn com_end_redirect() -> Option<String> {
    RD_BUFFER.lock().take()
}

// ============================================================
// Printing and errors
// ============================================================

/// Print to stdout, or into the capture buffer while one is open.
/// Messages are cut at `MAXPRINTMSG` bytes.
pub fn com_printf(msg: &str) {
    let msg = if msg.len() > MAXPRINTMSG {
        let mut end = MAXPRINTMSG;
        while !msg.is_char_boundary(end) {
            end -= 1;
        }
        &msg[..end]
    } else {
        msg
    };

    {
        let mut buf = RD_BUFFER.lock();
        if let Some(ref mut s) = *buf {
            s.push_str(msg);
            return;
        }
    }
    print!("{}", msg);
}

/// Print only when the `developer` cvar is set.
pub fn com_dprintf(msg: &str) {
    if crate::cvar::cvar_variable_value("developer") == 0.0 {
        return;
    }
    com_printf(msg);
}

/// Report an engine error.
///
/// `ERR_FATAL` logs to stderr and panics, `ERR_DROP` logs and returns to
/// the caller, any other code quits the process.
pub fn com_error(code: i32, msg: &str) {
    match code {
        ERR_FATAL => {
            eprintln!("Error: {}", msg);
            panic!("Fatal error: {}", msg);
        }
        ERR_DROP => eprintln!("********************\nERROR: {}\n********************", msg),
        _ => {
            println!("{}", msg);
            std::process::exit(0);
        }
    }
}
