//! Pure install-mode guidance for the OptiFine cosmetic patch. No I/O
//! happens here; the patch installer consults this before downloading
//! anything and surfaces the reason string to the user either way.

/// How the patch should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Merge into the base jar and synthesize a launchwrapper version.
    Integrate,
    /// Copy into the active mods directory as a regular mod file.
    DropAsMod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advice {
    Install { mode: InstallMode, reason: String },
    Refuse { reason: String },
}

impl Advice {
    pub fn is_refused(&self) -> bool {
        matches!(self, Advice::Refuse { .. })
    }
}

/// An OptiFine patch designator: a letter series, a number and an
/// optional pre-release, e.g. `H1`, `H1_pre2`, or as embedded in full
/// names like `HD_U_H1_pre2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PatchVersion {
    series: char,
    number: u32,
    /// `u32::MAX` marks a release; pre-releases order by their number.
    pre_rank: u32,
}

impl PatchVersion {
    pub fn new(series: char, number: u32, pre: Option<u32>) -> Self {
        Self {
            series,
            number,
            pre_rank: pre.unwrap_or(u32::MAX),
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.replace(' ', "_");
        let segments: Vec<&str> = normalized.split('_').collect();

        let mut found = None;
        for (i, segment) in segments.iter().enumerate() {
            let mut chars = segment.chars();
            let Some(first) = chars.next() else { continue };
            let rest: String = chars.collect();
            if first.is_ascii_uppercase() && !rest.is_empty() {
                if let Ok(number) = rest.parse::<u32>() {
                    let pre = segments.get(i + 1).and_then(|next| {
                        next.strip_prefix("pre").and_then(|n| n.parse::<u32>().ok())
                    });
                    found = Some(Self::new(first, number, pre));
                }
            }
        }
        found
    }
}

/// The oldest patch known to work on modern (1.16.5+) bases.
const MODERN_PATCH_FLOOR: PatchVersion = PatchVersion {
    series: 'H',
    number: 1,
    pre_rank: 2,
};

fn parse_dotted(version: &str) -> Vec<u32> {
    version
        .split(['.', '-'])
        .map_while(|part| part.parse::<u32>().ok())
        .collect()
}

fn at_least(version: &[u32], floor: &[u32]) -> bool {
    for i in 0..floor.len() {
        let v = version.get(i).copied().unwrap_or(0);
        match v.cmp(&floor[i]) {
            std::cmp::Ordering::Greater => return true,
            std::cmp::Ordering::Less => return false,
            std::cmp::Ordering::Equal => {}
        }
    }
    true
}

/// Forge builds in this closed range ship a class-loading change OptiFine
/// cannot attach to; the pair is refused no matter the patch version.
const BROKEN_FORGE_FLOOR: [u32; 3] = [48, 0, 0];
const BROKEN_FORGE_CEIL: [u32; 3] = [49, 0, 50];

/// Decides how (and whether) an OptiFine patch may be installed onto
/// `base_version`, optionally alongside a Forge build.
pub fn advise(base_version: &str, forge_version: Option<&str>, patch: &str) -> Advice {
    let Some(patch_version) = PatchVersion::parse(patch) else {
        return Advice::Refuse {
            reason: format!("unrecognized OptiFine patch designator \"{patch}\""),
        };
    };

    if let Some(forge) = forge_version {
        let forge_parts = parse_dotted(forge);
        if at_least(&forge_parts, &BROKEN_FORGE_FLOOR)
            && !at_least(&forge_parts, &BROKEN_FORGE_CEIL)
            || forge_parts.as_slice() == BROKEN_FORGE_CEIL
        {
            return Advice::Refuse {
                reason: format!(
                    "Forge {forge} is within the known-broken range 48.0.0-49.0.50 for OptiFine"
                ),
            };
        }
    }

    let base = parse_dotted(base_version);

    if at_least(&base, &[1, 16, 5]) && patch_version < MODERN_PATCH_FLOOR {
        return Advice::Refuse {
            reason: format!(
                "OptiFine {patch} predates H1 pre2 and cannot run on {base_version}"
            ),
        };
    }

    if at_least(&base, &[1, 13]) {
        Advice::Install {
            mode: InstallMode::DropAsMod,
            reason: format!(
                "{base_version} loads OptiFine as a regular mod file; no version is synthesized"
            ),
        }
    } else {
        Advice::Install {
            mode: InstallMode::Integrate,
            reason: format!(
                "{base_version} predates 1.13; OptiFine is merged into the client jar"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_parsing() {
        assert_eq!(
            PatchVersion::parse("H1_pre2"),
            Some(PatchVersion::new('H', 1, Some(2)))
        );
        assert_eq!(
            PatchVersion::parse("H1 pre2"),
            Some(PatchVersion::new('H', 1, Some(2)))
        );
        assert_eq!(
            PatchVersion::parse("HD_U_I7"),
            Some(PatchVersion::new('I', 7, None))
        );
        assert_eq!(PatchVersion::parse("garbage"), None);
    }

    #[test]
    fn release_outranks_its_prereleases() {
        let release = PatchVersion::new('H', 1, None);
        let pre = PatchVersion::new('H', 1, Some(2));
        assert!(pre < release);
        assert!(PatchVersion::new('G', 8, None) < pre);
        assert!(release < PatchVersion::new('I', 1, Some(1)));
    }

    #[test]
    fn modern_base_refuses_old_patches() {
        assert!(advise("1.16.5", None, "G8").is_refused());
        assert!(advise("1.16.5", None, "H1_pre1").is_refused());
        assert!(!advise("1.16.5", None, "H1_pre2").is_refused());
        assert!(!advise("1.20.1", None, "I7").is_refused());
    }

    #[test]
    fn legacy_base_integrates() {
        let advice = advise("1.12.2", Some("14.23.5.2860"), "E3");
        assert_eq!(
            advice,
            Advice::Install {
                mode: InstallMode::Integrate,
                reason: "1.12.2 predates 1.13; OptiFine is merged into the client jar".into()
            }
        );
    }

    #[test]
    fn modern_base_drops_as_mod() {
        match advise("1.20.1", None, "I6") {
            Advice::Install { mode, .. } => assert_eq!(mode, InstallMode::DropAsMod),
            Advice::Refuse { reason } => panic!("unexpected refusal: {reason}"),
        }
    }

    #[test]
    fn broken_forge_range_always_refused() {
        assert!(advise("1.21", Some("48.5.0"), "I7").is_refused());
        assert!(advise("1.21", Some("48.0.0"), "I7").is_refused());
        assert!(advise("1.21", Some("49.0.50"), "I7").is_refused());
        assert!(!advise("1.21", Some("49.0.51"), "I7").is_refused());
        assert!(!advise("1.20.1", Some("47.2.0"), "I6").is_refused());
    }
}
