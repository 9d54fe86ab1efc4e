use std::fmt;
use std::str::FromStr;

/// Errors parsing a hotkey string such as `ctrl+alt+p`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombinationError {
    #[error("Hotkey is empty")]
    Empty,

    #[error("Unknown key or modifier '{0}'")]
    UnknownToken(String),

    #[error("Hotkey '{0}' has no key, only modifiers")]
    MissingKey(String),

    #[error("Hotkey '{0}' names more than one key")]
    MultipleKeys(String),

    #[error("Hotkey '{0}' needs at least one modifier")]
    MissingModifier(String),
}

/// Modifier keys held as a small bit set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const CTRL: Modifiers = Modifiers(1);
    pub const ALT: Modifiers = Modifiers(1 << 1);
    pub const SHIFT: Modifiers = Modifiers(1 << 2);
    pub const SUPER: Modifiers = Modifiers(1 << 3);

    /// Display order
    const ORDERED: [(Modifiers, &'static str); 4] = [
        (Modifiers::CTRL, "ctrl"),
        (Modifiers::ALT, "alt"),
        (Modifiers::SHIFT, "shift"),
        (Modifiers::SUPER, "super"),
    ];

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn parse(token: &str) -> Option<Modifiers> {
        match token {
            "ctrl" | "control" => Some(Modifiers::CTRL),
            "alt" | "option" => Some(Modifiers::ALT),
            "shift" => Some(Modifiers::SHIFT),
            "super" | "win" | "windows" | "cmd" | "command" | "meta" => Some(Modifiers::SUPER),
            _ => None,
        }
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

/// Non-modifier key of a combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// `a`..`z`, stored lowercase
    Letter(char),
    /// `0`..`9`
    Digit(char),
    /// `f1`..`f12`
    Function(u8),
}

impl Key {
    fn parse(token: &str) -> Option<Key> {
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return match c {
                'a'..='z' => Some(Key::Letter(c)),
                '0'..='9' => Some(Key::Digit(c)),
                _ => None,
            };
        }

        let number = token.strip_prefix('f')?.parse::<u8>().ok()?;
        (1..=12).contains(&number).then_some(Key::Function(number))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Letter(c) | Key::Digit(c) => write!(f, "{}", c),
            Key::Function(n) => write!(f, "f{}", n),
        }
    }
}

/// A parsed global hotkey such as `ctrl+alt+p`
///
/// Parsing is case-insensitive and accepts common modifier aliases
/// (`control`, `option`, `win`, `cmd`). The display form is canonical:
/// lowercase, modifiers in `ctrl+alt+shift+super` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combination {
    modifiers: Modifiers,
    key: Key,
}

impl Combination {
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Combination { modifiers, key }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Uppercase form for user-facing messages, e.g. `CTRL+ALT+P`
    pub fn label(&self) -> String {
        self.to_string().to_uppercase()
    }
}

impl FromStr for Combination {
    type Err = CombinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(CombinationError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key = None;

        for token in normalized.split('+').map(str::trim) {
            if let Some(modifier) = Modifiers::parse(token) {
                modifiers |= modifier;
            } else if let Some(parsed) = Key::parse(token) {
                if key.replace(parsed).is_some() {
                    return Err(CombinationError::MultipleKeys(s.to_string()));
                }
            } else {
                return Err(CombinationError::UnknownToken(token.to_string()));
            }
        }

        let key = key.ok_or_else(|| CombinationError::MissingKey(s.to_string()))?;
        if modifiers.is_empty() {
            return Err(CombinationError::MissingModifier(s.to_string()));
        }

        Ok(Combination { modifiers, key })
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (modifier, name) in Modifiers::ORDERED {
            if self.modifiers.contains(modifier) {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_hotkey() {
        let combo: Combination = "ctrl+alt+p".parse().unwrap();
        assert!(combo.modifiers().contains(Modifiers::CTRL | Modifiers::ALT));
        assert!(!combo.modifiers().contains(Modifiers::SHIFT));
        assert_eq!(combo.key(), Key::Letter('p'));
    }

    #[test]
    fn test_display_is_canonical() {
        let combo: Combination = " Shift + Control + C ".parse().unwrap();
        assert_eq!(combo.to_string(), "ctrl+shift+c");
        assert_eq!(combo.label(), "CTRL+SHIFT+C");

        let combo: Combination = "cmd+option+F5".parse().unwrap();
        assert_eq!(combo.to_string(), "alt+super+f5");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Combination>(), Err(CombinationError::Empty));
        assert!(matches!(
            "ctrl+alt".parse::<Combination>(),
            Err(CombinationError::MissingKey(_))
        ));
        assert!(matches!(
            "ctrl+a+b".parse::<Combination>(),
            Err(CombinationError::MultipleKeys(_))
        ));
        assert!(matches!(
            "ctrl+hyper+p".parse::<Combination>(),
            Err(CombinationError::UnknownToken(t)) if t == "hyper"
        ));
        assert!(matches!(
            "p".parse::<Combination>(),
            Err(CombinationError::MissingModifier(_))
        ));
        assert!(matches!(
            "ctrl+f13".parse::<Combination>(),
            Err(CombinationError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_digits_and_function_keys() {
        let combo: Combination = "alt+7".parse().unwrap();
        assert_eq!(combo.key(), Key::Digit('7'));

        let combo: Combination = "ctrl+f12".parse().unwrap();
        assert_eq!(combo.key(), Key::Function(12));
    }
}
