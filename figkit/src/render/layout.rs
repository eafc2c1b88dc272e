use enumset::{EnumSet, EnumSetType};

use crate::font::Hardblank;

/// Combination of a layout mode and a set of smushing rules
///
/// Each font specifies a default via the `Old_Layout` and `Full_Layout` header parameters,
/// decoded once at load time by [`Layout::decode`]. The rule set is only relevant if the
/// layout mode is [`LayoutMode::Smushing`] (possibly by overriding the font default using
/// methods on [`Renderer`](crate::render::Renderer)).
#[derive(Clone, Copy, Debug)]
pub struct Layout {
    mode: LayoutMode,
    rules: EnumSet<SmushRule>,
}

impl Layout {
    /// Returns the layout mode.
    pub const fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Sets the layout mode.
    pub const fn set_mode(&mut self, mode: LayoutMode) {
        self.mode = mode;
    }

    /// Returns true if the given smushing rule is active.
    pub fn rule_active(&self, rule: SmushRule) -> bool {
        self.rules.contains(rule)
    }

    /// Returns true if *universal smushing* is active.
    ///
    /// When universal smushing, sub-characters from an earlier FIGcharacter are overridden by
    /// sub-characters from a later FIGcharacter (except if the later sub-character is a
    /// [*hardblank*](Hardblank)). This produces an "overlapping" effect with some FIGfonts,
    /// whereby the later FIGcharacter may appear to be in front.
    ///
    /// Returns `true` if and only if `rule_active(rule)` returns `false` for every rule.
    pub fn universal_smushing(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decode the layout parameters from a font header.
    ///
    /// The low byte of `Full_Layout` (when present) is authoritative:
    /// * bit 0: [`SmushRule::EqualCharacter`]
    /// * bit 1: [`SmushRule::Underscore`]
    /// * bit 2: [`SmushRule::Hierarchy`]
    /// * bit 3: [`SmushRule::OppositePair`]
    /// * bit 4: [`SmushRule::BigX`]
    /// * bit 5: [`SmushRule::Hardblank`]
    /// * bit 6: [`LayoutMode::Fitting`]
    /// * bit 7: [`LayoutMode::Smushing`], overriding bit 6 if both are set
    ///
    /// If neither of bits 6 and 7 is set, [`LayoutMode::FullSize`] is implied. If bit 7 is set
    /// but none of bits 0--5 are, *universal smushing* is active.
    ///
    /// When `Full_Layout` is absent (fonts predating it), the mode and rules derive from
    /// `Old_Layout`: a negative value means [`LayoutMode::FullSize`], zero means
    /// [`LayoutMode::Fitting`], and a positive value means [`LayoutMode::Smushing`] with the low
    /// six bits selecting rules in the same order as above.
    ///
    /// ```
    /// # use figkit::render::{Layout, LayoutMode, SmushRule};
    /// let layout = Layout::decode(15, Some(0b1000_1111));
    /// assert_eq!(layout.mode(), LayoutMode::Smushing);
    ///
    /// assert!(layout.rule_active(SmushRule::EqualCharacter));
    /// assert!(layout.rule_active(SmushRule::Underscore));
    /// assert!(layout.rule_active(SmushRule::Hierarchy));
    /// assert!(layout.rule_active(SmushRule::OppositePair));
    /// assert!(!layout.rule_active(SmushRule::BigX));
    /// assert!(!layout.rule_active(SmushRule::Hardblank));
    /// ```
    #[expect(clippy::missing_panics_doc, reason = "cannot actually panic")]
    #[must_use]
    pub fn decode(old_layout: i32, full_layout: Option<u16>) -> Self {
        if let Some(full_layout) = full_layout {
            let [_, low] = full_layout.to_be_bytes();
            let mode = LayoutMode::decode(low >> 6).expect("u8 >> 6 is in 0..=3");
            Self {
                mode,
                rules: SmushRule::decode(low & 63),
            }
        } else if old_layout < 0 {
            Self {
                mode: LayoutMode::FullSize,
                rules: EnumSet::empty(),
            }
        } else if old_layout == 0 {
            Self {
                mode: LayoutMode::Fitting,
                rules: EnumSet::empty(),
            }
        } else {
            #[expect(clippy::cast_possible_truncation, reason = "masked to six bits")]
            let bits = (old_layout & 63) as u8;
            Self {
                mode: LayoutMode::Smushing,
                rules: SmushRule::decode(bits),
            }
        }
    }

    /// Attempt to merge two touching sub-characters into one.
    ///
    /// `end` is the sub-character from the already-placed FIGcharacter, `start` the one from the
    /// FIGcharacter being appended. Returns `None` if the pair cannot be merged, in which case
    /// the caller keeps both. A pure function of its inputs; under [`LayoutMode::FullSize`] and
    /// [`LayoutMode::Fitting`] nothing ever merges.
    ///
    /// With an empty rule set under [`LayoutMode::Smushing`], *universal smushing* applies: the
    /// later sub-character wins, unless it is the hardblank.
    ///
    /// Otherwise the active rules are tried in a fixed priority order
    /// ([`SmushRule::EqualCharacter`] first, [`SmushRule::Hardblank`] last) and the first match
    /// wins.
    #[must_use]
    pub fn smush(self, end: u8, start: u8, hardblank: Hardblank) -> Option<u8> {
        if let LayoutMode::FullSize | LayoutMode::Fitting = self.mode {
            return None;
        }
        if self.rules.is_empty() {
            // universal smushing
            return if hardblank == start {
                Some(end)
            } else {
                Some(start)
            };
        }
        self.rules
            .iter()
            .find_map(|rule| rule.smush(end, start, hardblank))
    }
}

/// Layout modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    /// No kerning, the FIGcharacters are laid out as rectangles.
    FullSize,
    /// FIGcharacters are moved closer until they touch, which means that two non-blank
    /// sub-characters are adjacent. No sub-character is ever replaced.
    ///
    /// Note that hardblanks count as visible sub-characters here; see [`Hardblank`].
    Fitting,
    /// FIGcharacters are moved one step closer after they touch, if possible. Which
    /// sub-characters are allowed to collide is controlled by the *smushing rules* specified by
    /// the font. In case of *universal smushing*, later FIGcharacters are given priority.
    /// If some pair of overlapping sub-characters cannot be smushed,
    /// [fitting](LayoutMode::Fitting) occurs instead.
    Smushing,
}

impl LayoutMode {
    const fn decode(two_bits: u8) -> Option<Self> {
        match two_bits {
            0 => Some(Self::FullSize),
            1 => Some(Self::Fitting),
            2 | 3 => Some(Self::Smushing),
            _ => None,
        }
    }
}

/// Controlled smushing rules
///
/// The declaration order is the priority order in which [`Layout::smush`] tries active rules.
#[derive(EnumSetType, Debug)]
#[enumset(repr = "u8")]
pub enum SmushRule {
    /// Smush two sub-characters if they are the same, but not a [*hardblank*](Hardblank).
    EqualCharacter = 0,
    /// An underscore (`_`) will be overridden by any of: `|`, `/`, `\`, `[`, `]`, `{`, `}`, `(`,
    /// `)`, `<` or `>`.
    Underscore = 1,
    /// A hierarchy of six classes is used: `|`, `/\`, `[]`, `{}`, `()`, and `<>`. When two
    /// smushing sub-characters are from different classes, the one from the latter class wins.
    Hierarchy = 2,
    /// Smushes opposing brackets (`[]`), braces (`{}`) and parentheses (`()`) together, replacing
    /// any such pair with a vertical bar (`|`).
    ///
    /// Note that the pairs are smushed in either order, but they must be of the same kind.
    OppositePair = 3,
    /// Smushes `/\` into `|`, `\/` into `Y`, and `><` into `X`.
    ///
    /// Note that here the pairs *are* ordered, in particular `<>` is not affected by this rule.
    BigX = 4,
    /// Two [hardblanks](Hardblank) are smushed to a single one.
    ///
    /// A hardblank never merges with a non-hardblank.
    Hardblank = 5,
}

impl SmushRule {
    fn decode(bits: u8) -> EnumSet<Self> {
        EnumSet::from_repr_truncated(bits)
    }

    fn smush(self, end: u8, start: u8, hardblank: Hardblank) -> Option<u8> {
        match self {
            Self::EqualCharacter => (end == start && hardblank != start).then_some(start),
            Self::Underscore => underscore(start, end).or_else(|| underscore(end, start)),
            Self::Hierarchy => hierarchy(start, end).or_else(|| hierarchy(end, start)),
            Self::OppositePair => matches!(
                (end, start),
                (b'[', b']')
                    | (b']', b'[')
                    | (b'{', b'}')
                    | (b'}', b'{')
                    | (b'(', b')')
                    | (b')', b'(')
            )
            .then_some(b'|'),
            Self::BigX => match (end, start) {
                (b'/', b'\\') => Some(b'|'),
                (b'\\', b'/') => Some(b'Y'),
                (b'>', b'<') => Some(b'X'),
                _ => None,
            },
            Self::Hardblank => (hardblank == end && end == start).then_some(start),
        }
    }
}

fn underscore(a: u8, b: u8) -> Option<u8> {
    (matches!(
        b,
        b'|' | b'/' | b'\\' | b'[' | b']' | b'{' | b'}' | b'(' | b')' | b'<' | b'>'
    ) && a == b'_')
        .then_some(b)
}

fn hierarchy(a: u8, b: u8) -> Option<u8> {
    matches!(
        (a, b),
        (
            b'|',
            b'/' | b'\\' | b'[' | b']' | b'{' | b'}' | b'(' | b')' | b'<' | b'>'
        ) | (
            b'/' | b'\\',
            b'[' | b']' | b'{' | b'}' | b'(' | b')' | b'<' | b'>'
        ) | (b'[' | b']', b'{' | b'}' | b'(' | b')' | b'<' | b'>')
            | (b'{' | b'}', b'(' | b')' | b'<' | b'>')
            | (b'(' | b')', b'<' | b'>')
    )
    .then_some(b)
}

#[cfg(test)]
mod test {
    use enumset::EnumSet;

    use super::{Layout, LayoutMode, SmushRule};
    use crate::font::Hardblank;

    fn hardblank() -> Hardblank {
        Hardblank::try_from(b'$').unwrap()
    }

    fn with_rules(rules: EnumSet<SmushRule>) -> Layout {
        Layout {
            mode: LayoutMode::Smushing,
            rules,
        }
    }

    #[test]
    fn big_x_table() {
        let layout = with_rules(SmushRule::BigX.into());
        assert_eq!(layout.smush(b'/', b'\\', hardblank()), Some(b'|'));
        assert_eq!(layout.smush(b'\\', b'/', hardblank()), Some(b'Y'));
        assert_eq!(layout.smush(b'>', b'<', hardblank()), Some(b'X'));
        // unordered or unlisted pairs do not merge under this rule
        assert_eq!(layout.smush(b'<', b'>', hardblank()), None);
        assert_eq!(layout.smush(b'/', b'/', hardblank()), None);
        assert_eq!(layout.smush(b'x', b'x', hardblank()), None);
    }

    #[test]
    fn equal_character_excludes_hardblank() {
        let layout = with_rules(SmushRule::EqualCharacter.into());
        assert_eq!(layout.smush(b'#', b'#', hardblank()), Some(b'#'));
        assert_eq!(layout.smush(b'#', b'%', hardblank()), None);
        assert_eq!(layout.smush(b'$', b'$', hardblank()), None);
    }

    #[test]
    fn underscore_rule() {
        let layout = with_rules(SmushRule::Underscore.into());
        assert_eq!(layout.smush(b'_', b'|', hardblank()), Some(b'|'));
        assert_eq!(layout.smush(b')', b'_', hardblank()), Some(b')'));
        assert_eq!(layout.smush(b'_', b'a', hardblank()), None);
    }

    #[test]
    fn hierarchy_prefers_later_class() {
        let layout = with_rules(SmushRule::Hierarchy.into());
        assert_eq!(layout.smush(b'|', b'/', hardblank()), Some(b'/'));
        assert_eq!(layout.smush(b'}', b'\\', hardblank()), Some(b'}'));
        assert_eq!(layout.smush(b'(', b'>', hardblank()), Some(b'>'));
        // same class does not merge
        assert_eq!(layout.smush(b'/', b'\\', hardblank()), None);
    }

    #[test]
    fn opposite_pairs_become_bars() {
        let layout = with_rules(SmushRule::OppositePair.into());
        for (end, start) in [
            (b'[', b']'),
            (b']', b'['),
            (b'{', b'}'),
            (b'}', b'{'),
            (b'(', b')'),
            (b')', b'('),
        ] {
            assert_eq!(layout.smush(end, start, hardblank()), Some(b'|'));
        }
        // mixed kinds do not merge
        assert_eq!(layout.smush(b'[', b'}', hardblank()), None);
    }

    #[test]
    fn hardblank_rule_only_merges_hardblanks() {
        let layout = with_rules(SmushRule::Hardblank.into());
        assert_eq!(layout.smush(b'$', b'$', hardblank()), Some(b'$'));
        assert_eq!(layout.smush(b'$', b'x', hardblank()), None);
        assert_eq!(layout.smush(b'x', b'$', hardblank()), None);
    }

    #[test]
    fn universal_smushing_later_wins() {
        let layout = with_rules(EnumSet::empty());
        assert!(layout.universal_smushing());
        assert_eq!(layout.smush(b'a', b'b', hardblank()), Some(b'b'));
        // a later hardblank loses instead of printing as a blank
        assert_eq!(layout.smush(b'a', b'$', hardblank()), Some(b'a'));
    }

    #[test]
    fn nothing_merges_without_smushing() {
        for mode in [LayoutMode::FullSize, LayoutMode::Fitting] {
            let layout = Layout {
                mode,
                rules: EnumSet::all(),
            };
            assert_eq!(layout.smush(b'x', b'x', hardblank()), None);
        }
    }

    #[test]
    fn decode_legacy_old_layout() {
        assert_eq!(Layout::decode(-1, None).mode(), LayoutMode::FullSize);
        assert_eq!(Layout::decode(-3, None).mode(), LayoutMode::FullSize);
        assert_eq!(Layout::decode(0, None).mode(), LayoutMode::Fitting);
        let smushing = Layout::decode(24, None);
        assert_eq!(smushing.mode(), LayoutMode::Smushing);
        assert!(smushing.rule_active(SmushRule::OppositePair));
        assert!(smushing.rule_active(SmushRule::BigX));
        assert!(!smushing.rule_active(SmushRule::EqualCharacter));
    }

    #[test]
    fn decode_full_layout_wins() {
        // Old_Layout says full size; Full_Layout says kerning
        let layout = Layout::decode(-1, Some(64));
        assert_eq!(layout.mode(), LayoutMode::Fitting);
        // bit 7 set with no rule bits: universal smushing
        let universal = Layout::decode(0, Some(128));
        assert_eq!(universal.mode(), LayoutMode::Smushing);
        assert!(universal.universal_smushing());
        // neither mode bit set: full size
        let full = Layout::decode(15, Some(0));
        assert_eq!(full.mode(), LayoutMode::FullSize);
    }
}
