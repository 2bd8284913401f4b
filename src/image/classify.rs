//! File-name classification of ISO images into a distribution family and a CPU
//! architecture.

use serde::{Deserialize, Serialize};

/// Distribution lineage an image belongs to. Selects the boot syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Debian and derivatives (Ubuntu, Linux Mint, elementary OS).
    Debian,
    /// Pop!_OS.
    #[serde(rename = "pop-os")]
    PopOs,
    /// Fedora and the RHEL line (CentOS, Rocky, AlmaLinux).
    Fedora,
    /// openSUSE Leap and Tumbleweed.
    OpenSuse,
    /// Alpine Linux.
    Alpine,
    /// Arch Linux and derivatives (EndeavourOS, Manjaro).
    Arch,
    /// Anything unrecognized.
    Generic,
}

impl Family {
    /// Template key token for this family.
    pub fn token(self) -> &'static str {
        match self {
            Family::Debian => "debian",
            Family::PopOs => "pop-os",
            Family::Fedora => "fedora",
            Family::OpenSuse => "opensuse",
            Family::Alpine => "alpine",
            Family::Arch => "arch",
            Family::Generic => "generic",
        }
    }
}

serde_plain::derive_display_from_serialize!(Family);
serde_plain::derive_fromstr_from_deserialize!(Family);

/// Target CPU instruction set an image boots on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86_64,
    I386,
    Aarch64,
    Unknown,
}

impl Architecture {
    /// Template key token for this architecture.
    pub fn token(self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::I386 => "i386",
            Architecture::Aarch64 => "aarch64",
            Architecture::Unknown => "unknown",
        }
    }
}

serde_plain::derive_display_from_serialize!(Architecture);
serde_plain::derive_fromstr_from_deserialize!(Architecture);

/// Result of classifying one image file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Classification {
    pub family: Family,
    pub arch: Architecture,
}

impl Classification {
    /// Fallback for names no family rule recognizes.
    pub const GENERIC: Classification = Classification {
        family: Family::Generic,
        arch: Architecture::Unknown,
    };
}

/// Family rules, evaluated top to bottom. The Arch rule avoids the bare `arch`
/// token so that `aarch64` in a name never selects it.
const FAMILY_RULES: &[(&[&str], Family)] = &[
    (&["ubuntu", "debian", "linuxmint", "elementary"], Family::Debian),
    (&["pop-os"], Family::PopOs),
    (
        &["archlinux", "arch-", "arch_", "endeavouros", "manjaro"],
        Family::Arch,
    ),
    (&["fedora", "centos", "rhel", "rocky", "almalinux"], Family::Fedora),
    (&["opensuse", "tumbleweed", "leap", "suse"], Family::OpenSuse),
    (&["alpine"], Family::Alpine),
];

/// Architecture rules. `x86_64` must be tested before the bare `x86` token.
const ARCH_RULES: &[(&[&str], Architecture)] = &[
    (&["x86_64", "amd64"], Architecture::X86_64),
    (&["i386", "i686", "x86"], Architecture::I386),
    (&["aarch64", "arm64"], Architecture::Aarch64),
];

fn first_match<T: Copy>(name: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(aliases, _)| aliases.iter().any(|alias| name.contains(alias)))
        .map(|&(_, value)| value)
}

/// Detect the architecture from an already lower-cased name.
fn detect_architecture(lower: &str) -> Architecture {
    first_match(lower, ARCH_RULES).unwrap_or(Architecture::Unknown)
}

/// Classify an image by its file name.
///
/// Never fails. Names that match no family rule classify as
/// [`Classification::GENERIC`].
pub fn classify(base_name: &str) -> Classification {
    let lower = base_name.to_lowercase();

    match first_match(&lower, FAMILY_RULES) {
        Some(family) => Classification {
            family,
            arch: detect_architecture(&lower),
        },
        None => Classification::GENERIC,
    }
}
