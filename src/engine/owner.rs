//! Owner model: who can hold a capture point.

use std::hash::{Hash, Hasher};

use colored::Color as ColoredColor;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Individual,
    Group,
    Alliance,
}

impl OwnerKind {
    pub fn key(&self) -> &'static str {
        match self {
            OwnerKind::Individual => "individual",
            OwnerKind::Group => "group",
            OwnerKind::Alliance => "alliance",
        }
    }
}

/// Immutable owner value. Constructed fresh wherever a capture or lookup
/// needs one; carries no lifecycle of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOwner {
    pub kind: OwnerKind,
    pub id: String,
    pub display_name: Option<String>,
}

impl CaptureOwner {
    pub fn new(kind: OwnerKind, id: impl Into<String>, display_name: Option<&str>) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        Self {
            kind,
            id: id.into(),
            display_name,
        }
    }

    /// Builds an owner from a display name alone. A null or blank name is a
    /// valid "no owner" signal, not an error.
    pub fn from_display_name(kind: OwnerKind, display_name: Option<&str>) -> Option<Self> {
        let name = display_name.map(str::trim).filter(|name| !name.is_empty())?;
        Some(Self {
            kind,
            id: Self::canonical_id(kind, name),
            display_name: Some(name.to_string()),
        })
    }

    /// Deterministic id fallback: `kind:lowercased_name`, spaces to underscores.
    pub fn canonical_id(kind: OwnerKind, display_name: &str) -> String {
        format!(
            "{}:{}",
            kind.key(),
            display_name.trim().to_lowercase().replace(' ', "_")
        )
    }

    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Loose "same faction" predicate: same kind and a case-insensitive match
    /// on id or display name, either sufficing. Call sites that need strict
    /// identity use `==` instead.
    pub fn is_same_owner(&self, other: &CaptureOwner) -> bool {
        if self.kind != other.kind {
            return false;
        }
        if eq_ignore_case(&self.id, &other.id) {
            return true;
        }
        match (&self.display_name, &other.display_name) {
            (Some(a), Some(b)) => eq_ignore_case(a, b),
            _ => false,
        }
    }

    pub fn color(&self) -> Color {
        PALETTE[self.palette_index()].0
    }

    pub fn logging_color(&self) -> ColoredColor {
        PALETTE[self.palette_index()].1
    }

    fn palette_index(&self) -> usize {
        let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in self.id.to_lowercase().bytes() {
            acc ^= byte as u64;
            acc = acc.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (acc % PALETTE.len() as u64) as usize
    }
}

const PALETTE: [(Color, ColoredColor); 6] = [
    (Color::Blue, ColoredColor::Blue),
    (Color::Red, ColoredColor::Red),
    (Color::Green, ColoredColor::Green),
    (Color::Yellow, ColoredColor::Yellow),
    (Color::Magenta, ColoredColor::Magenta),
    (Color::Cyan, ColoredColor::Cyan),
];

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl PartialEq for CaptureOwner {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && eq_ignore_case(&self.id, &other.id)
            && match (&self.display_name, &other.display_name) {
                (Some(a), Some(b)) => eq_ignore_case(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for CaptureOwner {}

impl Hash for CaptureOwner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.to_lowercase().hash(state);
        self.display_name
            .as_ref()
            .map(|name| name.to_lowercase())
            .hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn group(name: &str) -> CaptureOwner {
        CaptureOwner::from_display_name(OwnerKind::Group, Some(name)).unwrap()
    }

    #[test]
    fn blank_or_missing_display_name_is_no_owner() {
        assert!(CaptureOwner::from_display_name(OwnerKind::Group, None).is_none());
        assert!(CaptureOwner::from_display_name(OwnerKind::Group, Some("")).is_none());
        assert!(CaptureOwner::from_display_name(OwnerKind::Group, Some("   ")).is_none());
    }

    #[test]
    fn canonical_id_is_deterministic() {
        let owner = group("Iron Vanguard");
        assert_eq!(owner.id, "group:iron_vanguard");
        assert_eq!(owner.display_name.as_deref(), Some("Iron Vanguard"));
        assert_eq!(owner, group("  Iron Vanguard  "));
    }

    #[test]
    fn equality_is_case_insensitive() {
        let a = group("Iron Vanguard");
        let b = group("IRON VANGUARD");
        assert_eq!(a, b);

        let hash = |owner: &CaptureOwner| {
            let mut hasher = DefaultHasher::new();
            owner.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn same_owner_is_reflexive_and_symmetric() {
        let a = group("Iron Vanguard");
        let b = group("iron vanguard");
        assert!(a.is_same_owner(&a));
        assert!(a.is_same_owner(&b));
        assert!(b.is_same_owner(&a));
    }

    #[test]
    fn same_owner_accepts_id_match_alone() {
        let by_name = group("Iron Vanguard");
        let partial = CaptureOwner::new(OwnerKind::Group, "group:iron_vanguard", None);
        assert!(by_name.is_same_owner(&partial));
        assert!(partial.is_same_owner(&by_name));
        // Strict equality still distinguishes them.
        assert_ne!(by_name, partial);
    }

    #[test]
    fn same_owner_accepts_display_name_match_alone() {
        let a = CaptureOwner::new(OwnerKind::Group, "group:legacy-17", Some("Iron Vanguard"));
        let b = group("iron vanguard");
        assert!(a.is_same_owner(&b));
    }

    #[test]
    fn kind_mismatch_is_never_the_same_owner() {
        let faction = group("Iron Vanguard");
        let player = CaptureOwner::from_display_name(OwnerKind::Individual, Some("Iron Vanguard"))
            .unwrap();
        assert!(!faction.is_same_owner(&player));
        assert!(!player.is_same_owner(&faction));
    }

    #[test]
    fn colors_are_stable_per_owner() {
        let a = group("Iron Vanguard");
        let b = group("IRON VANGUARD");
        assert_eq!(a.color(), b.color());
    }
}
