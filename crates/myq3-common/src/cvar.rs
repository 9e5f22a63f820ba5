// cvar.rs — dynamic variable tracking

use crate::common::com_printf;

use std::collections::HashMap;

// ============================================================
// Cvar flags
// ============================================================

pub const CVAR_ARCHIVE: i32 = 0x0001;    // saved to config file
pub const CVAR_USERINFO: i32 = 0x0002;   // sent to server on connect or change
pub const CVAR_SERVERINFO: i32 = 0x0004; // sent in response to front end requests
pub const CVAR_SYSTEMINFO: i32 = 0x0008; // duplicated on all clients
pub const CVAR_INIT: i32 = 0x0010;       // don't allow change from console at all
pub const CVAR_LATCH: i32 = 0x0020;      // only changes when the latched value is applied
pub const CVAR_ROM: i32 = 0x0040;        // display only, cannot be set by user at all
pub const CVAR_TEMP: i32 = 0x0100;       // not archived
pub const CVAR_CHEAT: i32 = 0x0200;      // can not be changed if cheats are disabled

/// A console variable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub reset_string: String, // value the cvar was created with
    pub latched_string: Option<String>,
    pub flags: i32,
    pub modified: bool,
    pub value: f32,
    pub integer: i32,
}

impl Cvar {
    fn assign(&mut self, value: &str) {
        self.string = value.to_string();
        self.value = value.trim().parse::<f32>().unwrap_or(0.0);
        self.integer = parse_integer(value);
        self.modified = true;
    }
}

/// atoi-style parse: leading integer digits, fraction dropped, garbage yields 0.
fn parse_integer(value: &str) -> i32 {
    let v = value.trim();
    if let Ok(i) = v.parse::<i32>() {
        return i;
    }
    v.parse::<f32>().map(|f| f as i32).unwrap_or(0)
}

/// The full cvar system context.
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// O(1) cvar lookup by name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
    /// Set while connected to a server that allows cheats.
    pub cheats_allowed: bool,
}

impl CvarContext {
    pub fn new() -> Self {
        Self {
            cvar_vars: Vec::new(),
            cvar_index: HashMap::new(),
            cheats_allowed: false,
        }
    }

    /// Find a cvar by name, returning its index. O(1) via HashMap.
    pub fn find_var_index(&self, name: &str) -> Option<usize> {
        self.cvar_index.get(name).copied()
    }

    /// Find a cvar by name. O(1) via HashMap.
    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |var| var.value)
    }

    /// Get the integer value of a cvar. Returns 0 if not found.
    pub fn variable_integer(&self, name: &str) -> i32 {
        self.find_var(name).map_or(0, |var| var.integer)
    }

    /// Get the string value of a cvar. Returns "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |var| var.string.as_str())
    }

    /// Get or create a cvar. If it already exists, the value is not changed
    /// but flags are OR'd in.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        let mut var = Cvar {
            name: name.to_string(),
            string: String::new(),
            reset_string: value.to_string(),
            latched_string: None,
            flags,
            modified: false,
            value: 0.0,
            integer: 0,
        };
        var.assign(value);
        self.cvar_vars.push(var);
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    /// Internal set implementation.
    fn set2(&mut self, name: &str, value: &str, force: bool) -> usize {
        let idx = match self.find_var_index(name) {
            Some(idx) => idx,
            None => return self.get(name, value, 0),
        };

        let cheats_allowed = self.cheats_allowed;
        let var = &mut self.cvar_vars[idx];

        if !force {
            if var.flags & CVAR_ROM != 0 {
                com_printf(&format!("{} is read only.\n", name));
                return idx;
            }

            if var.flags & CVAR_INIT != 0 {
                com_printf(&format!("{} is write protected.\n", name));
                return idx;
            }

            if var.flags & CVAR_CHEAT != 0 && !cheats_allowed {
                com_printf(&format!("{} is cheat protected.\n", name));
                return idx;
            }

            if var.flags & CVAR_LATCH != 0 {
                if value == var.string {
                    var.latched_string = None;
                } else {
                    com_printf(&format!("{} will be changed upon restarting.\n", name));
                    var.latched_string = Some(value.to_string());
                }
                return idx;
            }
        } else {
            var.latched_string = None;
        }

        if value == var.string {
            return idx; // not changed
        }

        var.assign(value);
        idx
    }

    /// Set a cvar value (respects ROM, INIT, CHEAT and LATCH flags).
    pub fn set(&mut self, name: &str, value: &str) -> usize {
        self.set2(name, value, false)
    }

    /// Force-set a cvar value (ignores every protection flag).
    pub fn force_set(&mut self, name: &str, value: &str) -> usize {
        self.set2(name, value, true)
    }

    /// Set a cvar from a float value.
    pub fn set_value(&mut self, name: &str, value: f32) {
        let val_str = if value == (value as i32) as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &val_str);
    }

    /// Apply all latched variable changes.
    pub fn get_latched_vars(&mut self) {
        for var in &mut self.cvar_vars {
            if let Some(latched) = var.latched_string.take() {
                var.assign(&latched);
            }
        }
    }

    /// Reset every cheat-protected cvar back to its creation value.
    /// Called when entering a game where cheats are not allowed.
    pub fn set_cheat_state(&mut self) {
        for var in &mut self.cvar_vars {
            if var.flags & CVAR_CHEAT != 0 && var.string != var.reset_string {
                let reset = var.reset_string.clone();
                var.latched_string = None;
                var.assign(&reset);
            }
        }
    }

    /// Get a cvar by handle (index).
    pub fn by_handle(&self, handle: usize) -> Option<&Cvar> {
        self.cvar_vars.get(handle)
    }

    /// Get a cvar's integer value by handle. Returns 0 if invalid.
    pub fn integer_by_handle(&self, handle: usize) -> i32 {
        self.by_handle(handle).map_or(0, |v| v.integer)
    }

    /// Get a cvar's float value by handle. Returns 0.0 if invalid.
    pub fn value_by_handle(&self, handle: usize) -> f32 {
        self.by_handle(handle).map_or(0.0, |v| v.value)
    }

    /// Get a cvar's string by handle. Returns "" if invalid.
    pub fn string_by_handle(&self, handle: usize) -> &str {
        self.by_handle(handle).map_or("", |v| v.string.as_str())
    }

    /// Check if a cvar has been modified, by handle.
    pub fn modified_by_handle(&self, handle: usize) -> bool {
        self.by_handle(handle).is_some_and(|v| v.modified)
    }

    /// Clear the modified flag on a cvar, by handle.
    pub fn clear_modified_by_handle(&mut self, handle: usize) {
        if let Some(v) = self.cvar_vars.get_mut(handle) {
            v.modified = false;
        }
    }
}

impl Default for CvarContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cvar_get_and_find() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", "42", 0);
        assert_eq!(ctx.variable_value("test_var"), 42.0);
        assert_eq!(ctx.variable_integer("test_var"), 42);
        assert_eq!(ctx.variable_string("test_var"), "42");
    }

    #[test]
    fn test_cvar_set() {
        let mut ctx = CvarContext::new();
        let h = ctx.get("test_var", "10", 0);
        ctx.clear_modified_by_handle(h);
        ctx.set("test_var", "20");
        assert_eq!(ctx.variable_value("test_var"), 20.0);
        assert!(ctx.modified_by_handle(h));
    }

    #[test]
    fn test_cvar_rom() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", "10", CVAR_ROM);
        ctx.set("test_var", "20"); // should be blocked
        assert_eq!(ctx.variable_integer("test_var"), 10);
        ctx.force_set("test_var", "20");
        assert_eq!(ctx.variable_integer("test_var"), 20);
    }

    #[test]
    fn test_cvar_cheat_protection() {
        let mut ctx = CvarContext::new();
        ctx.get("timescale", "1", CVAR_CHEAT);
        ctx.set("timescale", "2");
        assert_eq!(ctx.variable_value("timescale"), 1.0);

        ctx.cheats_allowed = true;
        ctx.set("timescale", "2");
        assert_eq!(ctx.variable_value("timescale"), 2.0);

        ctx.set_cheat_state();
        assert_eq!(ctx.variable_value("timescale"), 1.0);
    }

    #[test]
    fn test_cvar_latch() {
        let mut ctx = CvarContext::new();
        ctx.get("fs_game", "baseq3", CVAR_LATCH);
        ctx.set("fs_game", "missionpack");
        assert_eq!(ctx.variable_string("fs_game"), "baseq3");
        ctx.get_latched_vars();
        assert_eq!(ctx.variable_string("fs_game"), "missionpack");
    }

    #[test]
    fn test_cvar_set_value() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", "0", 0);
        ctx.set_value("test_var", -45.0);
        assert_eq!(ctx.variable_string("test_var"), "-45");
        ctx.set_value("test_var", 0.5);
        assert!((ctx.variable_value("test_var") - 0.5).abs() < 0.001);
        assert_eq!(ctx.variable_integer("test_var"), 0);
    }

    #[test]
    fn test_cvar_not_found() {
        let ctx = CvarContext::new();
        assert_eq!(ctx.variable_value("nonexistent"), 0.0);
        assert_eq!(ctx.variable_string("nonexistent"), "");
        assert_eq!(ctx.integer_by_handle(99), 0);
    }

    #[test]
    fn test_cvar_get_creates_once() {
        let mut ctx = CvarContext::new();
        let a = ctx.get("test", "1", 0);
        let b = ctx.get("test", "2", CVAR_ARCHIVE);
        assert_eq!(a, b);
        assert_eq!(ctx.variable_string("test"), "1");
        assert_eq!(ctx.by_handle(a).map(|v| v.flags), Some(CVAR_ARCHIVE));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("30"), 30);
        assert_eq!(parse_integer(" -12 "), -12);
        assert_eq!(parse_integer("2.9"), 2);
        assert_eq!(parse_integer("abc"), 0);
    }
}
