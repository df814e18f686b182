use std::any::TypeId;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// Stable identity of a command type.
///
/// Two commands share a class exactly when they are the same Rust type.
#[derive(Clone, Copy)]
pub struct CommandClass {
    id: TypeId,
    name: &'static str,
}

impl CommandClass {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths stripped, generic arguments included.
    pub fn short_name(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for CommandClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandClass {}

impl Hash for CommandClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut token_start = 0;
        for (index, ch) in self.name.char_indices() {
            if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&') {
                f.write_str(last_segment(&self.name[token_start..index]))?;
                f.write_char(ch)?;
                token_start = index + ch.len_utf8();
            }
        }
        f.write_str(last_segment(&self.name[token_start..]))
    }
}

impl fmt::Debug for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandClass({self})")
    }
}

impl Serialize for CommandClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Per-controller identity of a pushed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CommandId(pub(crate) u64);

impl CommandId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
