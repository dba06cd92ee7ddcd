//! Link state and PHY control.
//!
//! The integrated PHY is reached through whatever route [`PhyRoute`]
//! selects for the chip. Only clause 22 autonegotiation is driven here;
//! per-revision PHY parameter tables are not applied.
//!
//! Link speed is read from the MAC's PHYstatus register, which mirrors
//! the resolved autonegotiation outcome without touching the PHY.
//!
//! # Reference
//! IEEE 802.3 clause 22/28, RTL8168 datasheet §PHYstatus
//!
//! [`PhyRoute`]: crate::access::PhyRoute

use core::fmt;

use crate::access::{EriMask, RegisterAccess};
use crate::chip::{ChipRevision, DashType};
use crate::error::Result;
use crate::hw::{PciFunction, Platform, RegisterIo};
use crate::regs::{self, PhyStatus};

/// 8125 vendor register advertising 2.5G.
const PHY_OCP_ADV_2500: u32 = 0xa5d4;
const ADV_2500FULL: u16 = 1 << 7;

/// Undocumented C+ register the 8169 wants set before first use.
const REG_8169_82: usize = 0x82;
const PCI_CACHE_LINE_SIZE: u16 = 0x0c;
const PCI_LATENCY_TIMER: u16 = 0x0d;

// ═══════════════════════════════════════════════════════════════════════════
// LINK STATE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkSpeed {
    Mbps10,
    Mbps100,
    Mbps1000,
    Mbps2500,
}

impl LinkSpeed {
    pub fn mbps(self) -> u32 {
        match self {
            Self::Mbps10 => 10,
            Self::Mbps100 => 100,
            Self::Mbps1000 => 1000,
            Self::Mbps2500 => 2500,
        }
    }
}

impl fmt::Display for LinkSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Mbps", self.mbps())
    }
}

/// Resolved link as PHYstatus reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkState {
    pub up: bool,
    pub speed: Option<LinkSpeed>,
    pub full_duplex: bool,
    pub tx_pause: bool,
    pub rx_pause: bool,
}

impl LinkState {
    pub fn from_phy_status(status: PhyStatus) -> Self {
        if !status.contains(PhyStatus::LINK_STATUS) {
            return Self::default();
        }
        let speed = if status.contains(PhyStatus::SPEED_2500_FULL) {
            Some(LinkSpeed::Mbps2500)
        } else if status.contains(PhyStatus::SPEED_1000_FULL) {
            Some(LinkSpeed::Mbps1000)
        } else if status.contains(PhyStatus::SPEED_100) {
            Some(LinkSpeed::Mbps100)
        } else if status.contains(PhyStatus::SPEED_10) {
            Some(LinkSpeed::Mbps10)
        } else {
            None
        };
        Self {
            up: true,
            speed,
            full_duplex: status.intersects(
                PhyStatus::FULL_DUP | PhyStatus::SPEED_1000_FULL | PhyStatus::SPEED_2500_FULL,
            ),
            tx_pause: status.contains(PhyStatus::TX_FLOW_CTRL),
            rx_pause: status.contains(PhyStatus::RX_FLOW_CTRL),
        }
    }

    /// Speed in Mb/s, for the coalescing scale lookup.
    pub fn mbps(&self) -> Option<u32> {
        self.speed.map(LinkSpeed::mbps)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.up, self.speed) {
            (false, _) => f.write_str("down"),
            (true, None) => f.write_str("up"),
            (true, Some(s)) => write!(
                f,
                "up {} {}-duplex",
                s,
                if self.full_duplex { "full" } else { "half" }
            ),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PHY AND LINK CONTROL
// ═══════════════════════════════════════════════════════════════════════════

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    pub fn link_state(&self) -> LinkState {
        LinkState::from_phy_status(PhyStatus::from_bits_truncate(self.r32(regs::PHY_STATUS)))
    }

    /// Advertise every speed the board supports and restart
    /// autonegotiation.
    ///
    /// # Arguments
    /// - `gmii`: the board wires a gigabit PHY
    pub fn phy_start_aneg(&self, gmii: bool) -> Result<()> {
        let adv = regs::ADVERTISE_CSMA
            | regs::ADVERTISE_10HALF
            | regs::ADVERTISE_10FULL
            | regs::ADVERTISE_100HALF
            | regs::ADVERTISE_100FULL
            | regs::ADVERTISE_PAUSE_CAP
            | regs::ADVERTISE_PAUSE_ASYM;
        self.phy_write(regs::MII_ADVERTISE, adv)?;
        if gmii {
            self.phy_write(regs::MII_CTRL1000, regs::ADVERTISE_1000FULL | regs::ADVERTISE_1000HALF)?;
        }
        if self.revision().is_8125() {
            let v = self.phy_ocp_read(PHY_OCP_ADV_2500)?;
            self.phy_ocp_write(PHY_OCP_ADV_2500, v | ADV_2500FULL)?;
        }
        self.phy_restart_aneg()
    }

    /// Advertise 10M only, so a sleeping link draws the least power
    /// while still seeing wake packets.
    pub fn phy_speed_down(&self, gmii: bool) -> Result<()> {
        self.phy_write(
            regs::MII_ADVERTISE,
            regs::ADVERTISE_CSMA | regs::ADVERTISE_10HALF | regs::ADVERTISE_10FULL,
        )?;
        if gmii {
            self.phy_write(regs::MII_CTRL1000, 0)?;
        }
        if self.revision().is_8125() {
            let v = self.phy_ocp_read(PHY_OCP_ADV_2500)?;
            self.phy_ocp_write(PHY_OCP_ADV_2500, v & !ADV_2500FULL)?;
        }
        self.phy_restart_aneg()
    }

    fn phy_restart_aneg(&self) -> Result<()> {
        self.phy_modify(
            regs::MII_BMCR,
            regs::BMCR_PDOWN,
            regs::BMCR_ANENABLE | regs::BMCR_ANRESTART,
        )
    }

    /// One-time PHY setup on the way up.
    pub fn init_phy(&self, gmii: bool) -> Result<()> {
        if self.revision() <= ChipRevision::V06 {
            let pci = self.platform();
            pci.write_ext_config_byte(PCI_LATENCY_TIMER, 0x40);
            pci.write_ext_config_byte(PCI_CACHE_LINE_SIZE, 0x08);
            self.w8(REG_8169_82, 0x01);
        }
        self.phy_start_aneg(gmii)
    }

    /// Retune latency-sensitive registers for the negotiated speed.
    pub fn link_change_patch(&self, speed: Option<LinkSpeed>) -> Result<()> {
        use ChipRevision::*;
        match self.revision() {
            V34 | V38 => {
                let (a, b) = match speed {
                    Some(LinkSpeed::Mbps1000) => (0x11, 0x05),
                    Some(LinkSpeed::Mbps100) => (0x1f, 0x05),
                    _ => (0x1f, 0x3f),
                };
                self.eri_write(0x1bc, EriMask::M1111, a)?;
                self.eri_write(0x1dc, EriMask::M1111, b)?;
                self.reset_packet_filter()
            }
            V35 | V36 => {
                let (a, b) = if speed == Some(LinkSpeed::Mbps1000) { (0x11, 0x05) } else { (0x1f, 0x3f) };
                self.eri_write(0x1bc, EriMask::M1111, a)?;
                self.eri_write(0x1dc, EriMask::M1111, b)
            }
            V37 => {
                if speed == Some(LinkSpeed::Mbps10) {
                    self.eri_write(0x1d0, EriMask::M0011, 0x4d02)?;
                    self.eri_write(0x1dc, EriMask::M0011, 0x060a)
                } else {
                    self.eri_write(0x1d0, EriMask::M0011, 0x0000)
                }
            }
            _ => Ok(()),
        }
    }

    /// Keep the receiver listening for wake packets once the host stops.
    fn wol_enable_rx(&self) {
        let rev = self.revision();
        if rev >= ChipRevision::V25 {
            self.mod32(
                regs::RX_CONFIG,
                0,
                (regs::RxAccept::BROADCAST | regs::RxAccept::MULTICAST | regs::RxAccept::MY_PHYS).bits(),
            );
        }
        if rev >= ChipRevision::V40 {
            self.disable_rxdvgate();
        }
    }

    /// Last step of taking the interface down.
    ///
    /// # Arguments
    /// - `wake`: wake-on-LAN is armed
    pub fn prepare_power_down(&self, dash: DashType, wake: bool, gmii: bool) -> Result<()> {
        if dash.is_enabled() {
            return Ok(());
        }
        if matches!(self.revision(), ChipRevision::V32 | ChipRevision::V33) {
            self.ephy_write(0x19, 0xff64)?;
        }
        if wake {
            let ret = self.phy_speed_down(gmii);
            self.wol_enable_rx();
            return ret;
        }
        Ok(())
    }
}
