// cvar.rs — console variables read by the renderer each frame

use std::collections::HashMap;
use std::io::Write;

use parking_lot::Mutex;

use crate::common::com_printf;
use crate::q_shared::{CVAR_ARCHIVE, CVAR_LATCH, CVAR_NOSET};

/// A named console variable, kept as both its string and numeric form.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    /// Value waiting for the next video restart.
    pub latched_string: Option<String>,
    pub flags: i32,
    pub modified: bool,
    pub value: f32,
}

impl Cvar {
    fn new(name: &str, string: &str, flags: i32) -> Self {
        Self {
            name: name.to_string(),
            string: string.to_string(),
            latched_string: None,
            flags,
            modified: true,
            value: parse_value(string),
        }
    }

    fn assign(&mut self, string: String) {
        self.value = parse_value(&string);
        self.string = string;
        self.modified = true;
    }
}

/// Non-numeric strings read as 0.
fn parse_value(s: &str) -> f32 {
    s.trim().parse().unwrap_or(0.0)
}

/// A set of console variables. Lookups are by name; `get` hands back a
/// stable index.
#[derive(Default)]
pub struct CvarContext {
    vars: Vec<Cvar>,
    by_name: HashMap<String, usize>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.by_name.get(name).map(|&i| &self.vars[i])
    }

    /// 0 for unknown names.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |v| v.value)
    }

    /// "" for unknown names.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |v| &v.string)
    }

    /// Register `name` with a default, or return the existing variable with
    /// `flags` added. A missing default only looks the name up.
    pub fn get(&mut self, name: &str, default: Option<&str>, flags: i32) -> Option<usize> {
        if let Some(&i) = self.by_name.get(name) {
            self.vars[i].flags |= flags;
            return Some(i);
        }

        let i = self.vars.len();
        self.vars.push(Cvar::new(name, default?, flags));
        self.by_name.insert(name.to_string(), i);
        Some(i)
    }

    /// Register a table of `(name, default, flags)` entries.
    pub fn register_table(&mut self, table: &[(&str, &str, i32)]) {
        for &(name, default, flags) in table {
            self.get(name, Some(default), flags);
        }
    }

    fn store(&mut self, name: &str, value: &str, force: bool) -> Option<usize> {
        let Some(&i) = self.by_name.get(name) else {
            return self.get(name, Some(value), 0);
        };
        let var = &mut self.vars[i];

        if force {
            var.latched_string = None;
        } else if var.flags & CVAR_NOSET != 0 {
            com_printf(&format!("{} is write protected.\n", name));
            return Some(i);
        } else if var.flags & CVAR_LATCH != 0 {
            if var.latched_string.as_deref().unwrap_or(&var.string) != value {
                com_printf(&format!("{} will be changed after a video restart.\n", name));
                var.latched_string = Some(value.to_string());
            }
            return Some(i);
        }

        if var.string != value {
            var.assign(value.to_string());
        }
        Some(i)
    }

    /// Change a value, honoring write protection and latching.
    pub fn set(&mut self, name: &str, value: &str) -> Option<usize> {
        self.store(name, value, false)
    }

    /// Change a value regardless of flags, dropping any latched value.
    pub fn force_set(&mut self, name: &str, value: &str) -> Option<usize> {
        self.store(name, value, true)
    }

    /// Whole numbers are stored without a fraction ("3", not "3.0").
    pub fn set_value(&mut self, name: &str, value: f32) {
        let text = if value.fract() == 0.0 && value.abs() < i32::MAX as f32 {
            (value as i32).to_string()
        } else {
            value.to_string()
        };
        self.set(name, &text);
    }

    /// Apply every latched value; called on video restart.
    pub fn get_latched_vars(&mut self) {
        for var in &mut self.vars {
            if let Some(latched) = var.latched_string.take() {
                var.assign(latched);
            }
        }
    }

    /// True once per change: reading clears the flag.
    pub fn take_modified(&mut self, name: &str) -> bool {
        self.by_name
            .get(name)
            .map(|&i| std::mem::take(&mut self.vars[i].modified))
            .unwrap_or(false)
    }

    /// Write `set name "value"` lines for every archived variable.
    pub fn write_variables(&self, out: &mut dyn Write) -> std::io::Result<()> {
        for var in self.vars.iter().filter(|v| v.flags & CVAR_ARCHIVE != 0) {
            writeln!(out, "set {} \"{}\"", var.name, var.string)?;
        }
        Ok(())
    }
}

// ============================================================
// Process-wide variables
// ============================================================

static CVARS: Mutex<Option<CvarContext>> = Mutex::new(None);

/// Run `f` on the global variables, or return `otherwise` before `cvar_init`.
fn with_cvars<R>(otherwise: R, f: impl FnOnce(&mut CvarContext) -> R) -> R {
    match CVARS.lock().as_mut() {
        Some(ctx) => f(ctx),
        None => otherwise,
    }
}

pub fn cvar_init() {
    CVARS.lock().get_or_insert_with(CvarContext::new);
}

pub fn cvar_get(name: &str, default: &str, flags: i32) -> Option<usize> {
    with_cvars(None, |c| c.get(name, Some(default), flags))
}

pub fn cvar_register_table(table: &[(&str, &str, i32)]) {
    with_cvars((), |c| c.register_table(table))
}

pub fn cvar_set(name: &str, value: &str) {
    with_cvars((), |c| {
        c.set(name, value);
    })
}

pub fn cvar_set_value(name: &str, value: f32) {
    with_cvars((), |c| c.set_value(name, value))
}

pub fn cvar_variable_value(name: &str) -> f32 {
    with_cvars(0.0, |c| c.variable_value(name))
}

pub fn cvar_variable_string(name: &str) -> String {
    with_cvars(String::new(), |c| c.variable_string(name).to_string())
}

pub fn cvar_take_modified(name: &str) -> bool {
    with_cvars(false, |c| c.take_modified(name))
}

/// Apply every latched global value; the renderer calls this on (re)start.
pub fn cvar_get_latched_vars() {
    with_cvars((), |c| c.get_latched_vars())
}
