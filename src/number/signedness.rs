/// Sign tag carried alongside a machine-integer bit width (`spec.md` §3,
/// `MachineInt(value, bit-width w, sign)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Signedness {
    Signed,
    Unsigned,
}

impl Signedness {
    pub const fn is_signed(self) -> bool {
        matches!(self, Signedness::Signed)
    }
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Signedness::Unsigned)
    }
}

impl std::fmt::Display for Signedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signedness::Signed => write!(f, "signed"),
            Signedness::Unsigned => write!(f, "unsigned"),
        }
    }
}
