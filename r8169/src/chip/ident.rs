//! Chip revision identification.
//!
//! The XID is bits 31:20 of TxConfig, masked with 0xfcf. An ordered
//! table of `(mask, value)` pairs maps it to a revision; the first match
//! wins and the terminating catch-all means "unrecognized".

use core::fmt;

/// Mask applied to `TxConfig >> 20`.
pub const XID_MASK: u16 = 0xfcf;

/// MAC revision. Discriminants follow the vendor numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ChipRevision {
    V02 = 2,
    V03 = 3,
    V04 = 4,
    V05 = 5,
    V06 = 6,
    V07 = 7,
    V08 = 8,
    V09 = 9,
    V10 = 10,
    V11 = 11,
    V14 = 14,
    V17 = 17,
    V18 = 18,
    V19 = 19,
    V20 = 20,
    V21 = 21,
    V22 = 22,
    V23 = 23,
    V24 = 24,
    V25 = 25,
    V26 = 26,
    V28 = 28,
    V29 = 29,
    V30 = 30,
    V31 = 31,
    V32 = 32,
    V33 = 33,
    V34 = 34,
    V35 = 35,
    V36 = 36,
    V37 = 37,
    V38 = 38,
    V39 = 39,
    V40 = 40,
    V42 = 42,
    V43 = 43,
    V44 = 44,
    V46 = 46,
    V48 = 48,
    V51 = 51,
    V52 = 52,
    V53 = 53,
    V61 = 61,
    V63 = 63,
}

use ChipRevision::*;

impl ChipRevision {
    pub const ALL: [ChipRevision; 44] = [
        V02, V03, V04, V05, V06, V07, V08, V09, V10, V11, V14, V17, V18, V19, V20, V21, V22,
        V23, V24, V25, V26, V28, V29, V30, V31, V32, V33, V34, V35, V36, V37, V38, V39, V40,
        V42, V43, V44, V46, V48, V51, V52, V53, V61, V63,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    /// `true` when `self` lies in `lo..=hi`.
    #[inline]
    pub fn within(self, lo: ChipRevision, hi: ChipRevision) -> bool {
        lo <= self && self <= hi
    }

    /// Original RTL8169 PCI parts.
    pub fn is_8169(self) -> bool {
        self <= V06
    }

    pub fn is_8125(self) -> bool {
        self >= V61
    }

    /// 8168evl and later 8168 parts, excluding the 8106e.
    pub fn is_8168evl_up(self) -> bool {
        self.within(V34, V53) && self != V39
    }

    pub fn supports_eee(self) -> bool {
        self >= V34 && self != V37 && self != V39
    }

    /// Marketing name.
    pub fn name(self) -> &'static str {
        match self {
            V02 => "RTL8169s",
            V03 => "RTL8110s",
            V04 => "RTL8169sb/8110sb",
            V05 | V06 => "RTL8169sc/8110sc",
            V07 | V08 => "RTL8102e",
            V09 => "RTL8102e/RTL8103e",
            V10 => "RTL8101e/RTL8100e",
            V11 | V17 => "RTL8168b/8111b",
            V14 => "RTL8401",
            V18 | V23 | V24 => "RTL8168cp/8111cp",
            V19 | V20 | V21 | V22 => "RTL8168c/8111c",
            V25 | V26 => "RTL8168d/8111d",
            V28 | V31 => "RTL8168dp/8111dp",
            V29 | V30 => "RTL8105e",
            V32 | V33 => "RTL8168e/8111e",
            V34 => "RTL8168evl/8111evl",
            V35 | V36 => "RTL8168f/8111f",
            V37 => "RTL8402",
            V38 => "RTL8411",
            V39 => "RTL8106e",
            V40 => "RTL8168g/8111g",
            V42 => "RTL8168gu/8111gu",
            V43 => "RTL8106eus",
            V44 => "RTL8411b",
            V46 => "RTL8168h/8111h",
            V48 => "RTL8107e",
            V51 => "RTL8168ep/8111ep",
            V52 | V53 => "RTL8168fp/RTL8117",
            V61 => "RTL8125A",
            V63 => "RTL8125B",
        }
    }
}

impl fmt::Display for ChipRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (VER_{:02})", self.name(), self.number())
    }
}

/// One identification rule. `rev == None` is the terminating catch-all.
struct XidRule {
    mask: u16,
    val: u16,
    rev: Option<ChipRevision>,
}

const fn rule(mask: u16, val: u16, rev: ChipRevision) -> XidRule {
    XidRule { mask, val, rev: Some(rev) }
}

/// Ordered: more specific masks precede the broader ones they overlap.
static XID_TABLE: [XidRule; 46] = [
    // 8125B family
    rule(0x7cf, 0x641, V63),
    // 8125A family
    rule(0x7cf, 0x609, V61),
    // RTL8117
    rule(0x7cf, 0x54b, V53),
    rule(0x7cf, 0x54a, V52),
    // 8168EP family
    rule(0x7cf, 0x502, V51),
    // 8168H family
    rule(0x7cf, 0x541, V46),
    // 8168G family
    rule(0x7cf, 0x5c8, V44),
    rule(0x7cf, 0x509, V42),
    rule(0x7cf, 0x4c0, V40),
    // 8168F family
    rule(0x7c8, 0x488, V38),
    rule(0x7cf, 0x481, V36),
    rule(0x7cf, 0x480, V35),
    // 8168E family
    rule(0x7c8, 0x2c8, V34),
    rule(0x7cf, 0x2c1, V32),
    rule(0x7c8, 0x2c0, V33),
    // 8168D family
    rule(0x7cf, 0x281, V25),
    rule(0x7c8, 0x280, V26),
    // 8168DP family
    rule(0x7cf, 0x28a, V28),
    rule(0x7cf, 0x28b, V31),
    // 8168C family
    rule(0x7cf, 0x3c9, V23),
    rule(0x7cf, 0x3c8, V18),
    rule(0x7c8, 0x3c8, V24),
    rule(0x7cf, 0x3c0, V19),
    rule(0x7cf, 0x3c2, V20),
    rule(0x7cf, 0x3c3, V21),
    rule(0x7c8, 0x3c0, V22),
    // 8168B family
    rule(0x7c8, 0x380, V17),
    rule(0x7c8, 0x300, V11),
    // 8101 family
    rule(0x7c8, 0x448, V39),
    rule(0x7c8, 0x440, V37),
    rule(0x7cf, 0x409, V29),
    rule(0x7c8, 0x408, V30),
    rule(0x7cf, 0x349, V08),
    rule(0x7cf, 0x249, V08),
    rule(0x7cf, 0x348, V07),
    rule(0x7cf, 0x248, V07),
    rule(0x7cf, 0x240, V14),
    rule(0x7c8, 0x348, V09),
    rule(0x7c8, 0x248, V09),
    rule(0x7c8, 0x340, V10),
    // 8110 family
    rule(0xfc8, 0x980, V06),
    rule(0xfc8, 0x180, V05),
    rule(0xfc8, 0x100, V04),
    rule(0xfc8, 0x040, V03),
    rule(0xfc8, 0x008, V02),
    // Catch-all
    XidRule { mask: 0x000, val: 0x000, rev: None },
];

/// Extract the XID from a TxConfig value.
pub fn xid_from_txconfig(txconfig: u32) -> u16 {
    ((txconfig >> 20) as u16) & XID_MASK
}

/// Map an XID to a revision.
///
/// # Arguments
/// - `xid`: value from [`xid_from_txconfig`]
/// - `gmii`: board supports gigabit; the 8168gu and 8168h XIDs identify
///   the Fast Ethernet 8106eus and 8107e when it does not
///
/// # Returns
/// `None` for an unrecognized XID.
pub fn identify(xid: u16, gmii: bool) -> Option<ChipRevision> {
    let rev = XID_TABLE
        .iter()
        .find(|r| xid & r.mask == r.val)
        .and_then(|r| r.rev)?;

    Some(match rev {
        V42 if !gmii => V43,
        V46 if !gmii => V48,
        other => other,
    })
}
