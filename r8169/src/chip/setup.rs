//! Generic MAC setup shared by every revision.
//!
//! Reset, FIFO quiesce, RX/TX configuration words, jumbo switching, the
//! descriptor base registers, MAC address programming and the PCIe power
//! management knobs. The per-revision register tables live in
//! [`super::bringup`]; this module holds the code that is the same
//! shape on all chips with small revision switches inside.

use super::ident::ChipRevision::*;
use crate::access::{EriMask, Poll, Protocol, RegisterAccess};
use crate::error::Result;
use crate::hw::{Delay, PciFunction, Platform, RegisterIo};
use crate::regs::{self, ChipCmd};
use crate::types::{MacAddress, ETH_DATA_LEN, ETH_HLEN};

pub const POLL_CHIP_RESET: Poll = Poll::new(100, 100);
pub const POLL_FIFO_EMPTY: Poll = Poll::new(100, 42);
pub const POLL_LINK_LIST: Poll = Poll::new(100, 42);
pub const POLL_NPQ: Poll = Poll::new(20, 2000);
pub const POLL_TXCFG_EMPTY: Poll = Poll::new(100, 666);
pub const POLL_CMAC: Poll = Poll::new(50_000, 2000);

/// Extended config offset of the L0s/L1 entry latency byte.
const ASPM_LATENCY_OFFSET: u16 = 0x070f;
/// Dword holding [`ASPM_LATENCY_OFFSET`] for the CSI fallback.
const ASPM_LATENCY_CSI: u32 = 0x070c;

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    // ───────────────────────────────────────────────────────────────────
    // Reset and quiesce
    // ───────────────────────────────────────────────────────────────────

    /// Soft reset of the MAC. RX/TX DMA stop and the FIFOs are flushed.
    pub fn hw_reset(&self) -> Result<()> {
        self.w8(regs::CHIP_CMD, ChipCmd::RESET.bits());
        self.wait_for(Protocol::Mcu, POLL_CHIP_RESET, false, |a| {
            a.r8(regs::CHIP_CMD) & ChipCmd::RESET.bits() != 0
        })
    }

    fn wait_txcfg_empty(&self, poll: Poll) -> Result<()> {
        self.wait_reg32(Protocol::Mcu, regs::TX_CONFIG, regs::TXCFG_EMPTY, true, poll)
    }

    fn wait_rxtx_empty(&self) -> Result<()> {
        self.wait_for(Protocol::Mcu, POLL_FIFO_EMPTY, true, |a| {
            a.r8(regs::MCU) & regs::RXTX_EMPTY == regs::RXTX_EMPTY
        })
    }

    /// Wait for the TX and RX FIFOs to drain (8168g and later).
    pub fn wait_txrx_fifo_empty(&self) -> Result<()> {
        let rev = self.revision();
        if rev.within(V40, V53) {
            self.wait_txcfg_empty(POLL_FIFO_EMPTY)?;
            self.wait_rxtx_empty()
        } else if rev == V61 {
            self.wait_rxtx_empty()
        } else if rev == V63 {
            self.mod8(regs::CHIP_CMD, 0, ChipCmd::STOP_REQ.bits());
            self.wait_rxtx_empty()?;
            // IntrMitigate doubles as a FIFO status word on the 8125.
            self.wait_for(Protocol::Mcu, POLL_FIFO_EMPTY, true, |a| {
                a.r16(regs::INTR_MITIGATE) & 0x0103 == 0x0103
            })
        } else {
            Ok(())
        }
    }

    /// Gate RXDV so no new frames enter the FIFO, then let it drain.
    pub fn enable_rxdvgate(&self) -> Result<()> {
        self.mod32(regs::MISC, 0, regs::RXDV_GATED_EN);
        self.platform().msleep(2);
        self.wait_txrx_fifo_empty()
    }

    pub fn disable_rxdvgate(&self) {
        self.mod32(regs::MISC, regs::RXDV_GATED_EN, 0);
    }

    /// Stop TX DMA before a reset, the way each generation wants it.
    pub fn quiesce(&self) -> Result<()> {
        let rev = self.revision();
        match rev {
            V28 | V31 => self.wait_for(Protocol::Mcu, POLL_NPQ, false, |a| {
                a.r8(regs::TX_POLL) & regs::NPQ != 0
            }),
            r if r.within(V34, V38) => {
                self.mod8(regs::CHIP_CMD, 0, ChipCmd::STOP_REQ.bits());
                self.wait_txcfg_empty(POLL_TXCFG_EMPTY)
            }
            r if r >= V40 => {
                let ret = self.enable_rxdvgate();
                self.platform().msleep(2);
                ret
            }
            _ => {
                self.mod8(regs::CHIP_CMD, 0, ChipCmd::STOP_REQ.bits());
                self.platform().udelay(100);
                Ok(())
            }
        }
    }

    /// 8168ep/8117: halt the management controller's MAC access.
    pub fn stop_cmac(&self) -> Result<()> {
        self.mod8(regs::IBCR2, 0x01, 0);
        let ret = self.wait_for(Protocol::Cmac, POLL_CMAC, true, |a| {
            a.r8(regs::IBISR0) & 0x20 != 0
        });
        self.mod8(regs::IBISR0, 0, 0x20);
        self.mod8(regs::IBCR0, 0x01, 0);
        ret
    }

    fn wait_link_list_ready(&self) -> Result<()> {
        self.wait_for(Protocol::Mcu, POLL_LINK_LIST, true, |a| {
            a.r8(regs::MCU) & regs::LINK_LIST_RDY != 0
        })
    }

    /// One-time MCU handshake run at attach, before the first reset.
    pub fn hw_initialize(&self) -> Result<()> {
        let rev = self.revision();
        if rev.within(V51, V53) {
            self.stop_cmac()?;
        }
        if rev.within(V40, V53) || rev.is_8125() {
            self.enable_rxdvgate()?;
            self.mod8(regs::CHIP_CMD, (ChipCmd::TX_ENABLE | ChipCmd::RX_ENABLE).bits(), 0);
            self.platform().msleep(1);
            self.mod8(regs::MCU, regs::NOW_IS_OOB, 0);

            self.mac_ocp_modify(0xe8de, 1 << 14, 0)?;
            self.wait_link_list_ready()?;

            if rev.is_8125() {
                self.mac_ocp_write(0xc0aa, 0x07d0)?;
                self.mac_ocp_write(0xc0a6, 0x0150)?;
                self.mac_ocp_write(0xc01e, 0x5555)?;
            } else {
                self.mac_ocp_modify(0xe8de, 0, 1 << 15)?;
            }
            self.wait_link_list_ready()?;
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────
    // RX / TX configuration words
    // ───────────────────────────────────────────────────────────────────

    /// Base RxConfig for the revision, accept bits cleared.
    pub fn init_rxcfg(&self) {
        let rev = self.revision();
        let val = if rev.is_8169() || rev.within(V10, V17) {
            regs::RX_FIFO_THRESH | regs::RX_DMA_BURST
        } else if rev.within(V18, V24) || rev.within(V34, V36) || rev == V38 {
            regs::RX128_INT_EN | regs::RX_MULTI_EN | regs::RX_DMA_BURST
        } else if rev.within(V40, V53) {
            regs::RX128_INT_EN | regs::RX_MULTI_EN | regs::RX_DMA_BURST | regs::RX_EARLY_OFF
        } else if rev.is_8125() {
            regs::RX_FETCH_DFLT_8125 | regs::RX_DMA_BURST
        } else {
            regs::RX128_INT_EN | regs::RX_DMA_BURST
        };
        self.w32(regs::RX_CONFIG, val);
    }

    /// Close the receiver by clearing every accept bit.
    pub fn rx_close(&self) {
        self.mod32(regs::RX_CONFIG, regs::RX_CONFIG_ACCEPT_MASK, 0);
    }

    pub fn set_tx_config(&self) {
        let mut val = regs::TX_DMA_BURST << regs::TX_DMA_SHIFT
            | regs::TX_INTER_FRAME_GAP << regs::TX_INTER_FRAME_GAP_SHIFT;
        if self.revision().is_8168evl_up() {
            val |= regs::TXCFG_AUTO_FIFO;
        }
        self.w32(regs::TX_CONFIG, val);
    }

    pub fn set_rx_max_size(&self) {
        self.w16(regs::RX_MAX_SIZE, regs::RX_MAX_SIZE_VALUE);
    }

    /// Program both ring bases, high halves first.
    pub fn set_desc_addr(&self, tx_ring: u64, rx_ring: u64) {
        self.w32(regs::TX_DESC_START_ADDR_HIGH, (tx_ring >> 32) as u32);
        self.w32(regs::TX_DESC_START_ADDR_LOW, tx_ring as u32);
        self.w32(regs::RX_DESC_ADDR_HIGH, (rx_ring >> 32) as u32);
        self.w32(regs::RX_DESC_ADDR_LOW, rx_ring as u32);
    }

    /// 8169sc timing register, depends on the PCI bus clock.
    pub fn set_magic_reg(&self) {
        let mut val = match self.revision() {
            V05 => 0x000f_ff00,
            V06 => 0x00ff_ff00,
            _ => return,
        };
        if self.r8(regs::CONFIG2) & regs::PCI_CLOCK_66MHZ != 0 {
            val |= 0xff;
        }
        self.w32(regs::MAGIC_8169, val);
    }

    /// Switch jumbo frame support for `mtu`.
    ///
    /// # Arguments
    /// - `gmii`: the max read request tweak only applies to gigabit boards
    pub fn jumbo_config(&self, mtu: usize, gmii: bool) {
        let jumbo = mtu > ETH_DATA_LEN;
        let rev = self.revision();
        let mut readrq = 4096;

        self.unlock_config();
        if rev == V17 {
            if jumbo {
                readrq = 512;
                self.mod8(regs::CONFIG4, 0, 0x01);
            } else {
                self.mod8(regs::CONFIG4, 0x01, 0);
            }
        } else if rev.within(V18, V26) {
            if jumbo {
                readrq = 512;
                self.mod8(regs::CONFIG3, 0, regs::JUMBO_EN0);
                self.mod8(regs::CONFIG4, 0, regs::JUMBO_EN1);
            } else {
                self.mod8(regs::CONFIG3, regs::JUMBO_EN0, 0);
                self.mod8(regs::CONFIG4, regs::JUMBO_EN1, 0);
            }
        } else if rev == V28 {
            if jumbo {
                self.mod8(regs::CONFIG3, 0, regs::JUMBO_EN0);
            } else {
                self.mod8(regs::CONFIG3, regs::JUMBO_EN0, 0);
            }
        } else if rev.within(V31, V33) {
            if jumbo {
                self.w8(regs::MAX_TX_PACKET_SIZE, 0x24);
                self.mod8(regs::CONFIG3, 0, regs::JUMBO_EN0);
                self.mod8(regs::CONFIG4, 0, 0x01);
            } else {
                self.w8(regs::MAX_TX_PACKET_SIZE, regs::NO_EARLY_TX);
                self.mod8(regs::CONFIG3, regs::JUMBO_EN0, 0);
                self.mod8(regs::CONFIG4, 0x01, 0);
            }
        }
        self.lock_config();

        if self.platform().is_pcie() && gmii {
            self.platform().set_max_read_request(readrq);
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // MAC address
    // ───────────────────────────────────────────────────────────────────

    /// Address stored by the chip's own non-volatile path, if any.
    pub fn read_stored_mac(&self) -> Result<Option<MacAddress>> {
        let rev = self.revision();
        if rev.is_8168evl_up() && rev != V34 {
            let lo = self.eri_read(0xe0)?.to_le_bytes();
            let hi = self.eri_read(0xe4)?.to_le_bytes();
            Ok(Some(MacAddress::new([lo[0], lo[1], lo[2], lo[3], hi[0], hi[1]])))
        } else if rev.is_8125() {
            Ok(Some(MacAddress::new(self.read_mac_from(regs::MAC0_BKP))))
        } else {
            Ok(None)
        }
    }

    /// Program the receive address register.
    pub fn rar_set(&self, addr: &MacAddress) -> Result<()> {
        let a = addr.as_bytes();
        let lo32 = u32::from_le_bytes([a[0], a[1], a[2], a[3]]);
        let hi16 = u16::from_le_bytes([a[4], a[5]]) as u32;

        self.unlock_config();
        self.w32(regs::MAC4, hi16);
        self.commit();
        self.w32(regs::MAC0, lo32);
        self.commit();

        let ret = if self.revision() == V34 {
            self.rar_exgmac_set(a)
        } else {
            Ok(())
        };
        self.lock_config();
        ret
    }

    fn rar_exgmac_set(&self, a: &[u8; 6]) -> Result<()> {
        let lo16 = u16::from_le_bytes([a[0], a[1]]) as u32;
        self.eri_write(0xe0, EriMask::M1111, u32::from_le_bytes([a[0], a[1], a[2], a[3]]))?;
        self.eri_write(0xe4, EriMask::M1111, u16::from_le_bytes([a[4], a[5]]) as u32)?;
        self.eri_write(0xf0, EriMask::M1111, lo16 << 16)?;
        self.eri_write(0xf4, EriMask::M1111, u32::from_le_bytes([a[2], a[3], a[4], a[5]]))
    }

    // ───────────────────────────────────────────────────────────────────
    // Packet filter and EEE
    // ───────────────────────────────────────────────────────────────────

    pub fn reset_packet_filter(&self) -> Result<()> {
        self.eri_clear_bits(0xdc, 1 << 0)?;
        self.eri_set_bits(0xdc, 1 << 0)
    }

    pub fn config_eee_mac_8168(&self) -> Result<()> {
        // EEE LED frequency
        if self.revision() != V38 {
            self.mod8(regs::EEE_LED, 0x07, 0);
        }
        self.eri_set_bits(0x1b0, 0x0003)
    }

    pub fn config_eee_mac_8125a(&self) -> Result<()> {
        self.mac_ocp_modify(0xe040, 0, 0x0003)?;
        self.mac_ocp_modify(0xeb62, 0, 0x0006)
    }

    pub fn set_eee_txidle_timer(&self, mtu: usize) {
        self.w16(regs::EEE_TXIDLE_TIMER_8125, (mtu + ETH_HLEN + 0x20) as u16);
    }

    pub fn config_eee_mac_8125b(&self, mtu: usize) -> Result<()> {
        self.set_eee_txidle_timer(mtu);
        self.mac_ocp_modify(0xe040, 0, 0x0003)
    }

    // ───────────────────────────────────────────────────────────────────
    // PCIe power management
    // ───────────────────────────────────────────────────────────────────

    /// Set the L0s/L1 entry latency, through CSI when the platform has
    /// no extended config access.
    pub fn set_aspm_entry_latency(&self, val: u8) -> Result<()> {
        if self.platform().write_ext_config_byte(ASPM_LATENCY_OFFSET, val) {
            return Ok(());
        }
        log::debug!("[r8169] no extended config access, using CSI");
        let csi = self.csi_read(ASPM_LATENCY_CSI)? & 0x00ff_ffff;
        self.csi_write(ASPM_LATENCY_CSI, csi | (val as u32) << 24)
    }

    /// Chip side of ASPM and CLKREQ.
    ///
    /// # Arguments
    /// - `enable`: request ASPM on
    /// - `manageable`: the OS owns ASPM; when it does not, an enable
    ///   request turns ASPM off instead
    pub fn aspm_clkreq(&self, enable: bool, manageable: bool) -> Result<()> {
        let rev = self.revision();
        if rev < V32 {
            return Ok(());
        }
        let l12_capable = rev.within(V46, V48) || rev.is_8125();

        if enable && manageable {
            if matches!(rev, V42 | V43) {
                return Ok(());
            }
            self.mod_config5(0, regs::ASPM_EN);
            self.mod_config2(0, regs::CLK_REQ_EN);
            if l12_capable {
                // Reset the EPHY tx/rx disable timer; allow L1.2.
                self.mac_ocp_modify(0xe094, 0xff00, 0)?;
                self.mac_ocp_modify(0xe092, 0x00ff, 1 << 2)?;
            }
        } else {
            if l12_capable {
                self.mac_ocp_modify(0xe092, 0x00ff, 0)?;
            }
            self.mod_config2(regs::CLK_REQ_EN, 0);
            self.mod_config5(regs::ASPM_EN, 0);
        }
        Ok(())
    }

    /// Events allowed to pull the link out of L1.
    pub fn enable_exit_l1(&self) -> Result<()> {
        let rev = self.revision();
        if rev.within(V34, V36) {
            self.eri_set_bits(0xd4, 0x1f00)
        } else if rev.within(V37, V38) {
            self.eri_set_bits(0xd4, 0x0c00)
        } else if rev >= V40 {
            self.mac_ocp_modify(0xc0ac, 0, 0x1f80)
        } else {
            Ok(())
        }
    }

    pub fn disable_exit_l1(&self) -> Result<()> {
        let rev = self.revision();
        if rev.within(V34, V38) {
            self.eri_clear_bits(0xd4, 0x1f00)
        } else if rev >= V40 {
            self.mac_ocp_modify(0xc0ac, 0x1f80, 0)
        } else {
            Ok(())
        }
    }

    /// Allow the PLL to power down in D3. Kept running when a wake source
    /// or management firmware needs it.
    pub fn set_d3_pll_down(&self, enable: bool) {
        let rev = self.revision();
        let supported = rev.within(V25, V26)
            || rev.within(V29, V30)
            || rev.within(V32, V37)
            || rev >= V39;
        if !supported {
            return;
        }
        if enable {
            self.mod8(regs::PMCH, regs::D3_NO_PLL_DOWN, 0);
        } else {
            self.mod8(regs::PMCH, 0, regs::D3_NO_PLL_DOWN);
        }
    }

    /// Board vendor validated ASPM L1.2 on this 8125.
    pub fn aspm_is_safe(&self) -> bool {
        self.revision() >= V61 && self.mac_ocp_read(0xc0b2).map(|v| v & 0xf != 0).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ChipRevision;
    use crate::error::R8169Error;
    use crate::mock::{test_access, MockIo};

    #[test]
    fn test_hw_reset_waits_for_self_clear() {
        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        assert!(hw.hw_reset().is_ok());
        assert_eq!(io.peek8(regs::CHIP_CMD) & ChipCmd::RESET.bits(), 0);
    }

    #[test]
    fn test_init_rxcfg_per_generation() {
        let cases = [
            (ChipRevision::V04, regs::RX_FIFO_THRESH | regs::RX_DMA_BURST),
            (ChipRevision::V20, regs::RX128_INT_EN | regs::RX_MULTI_EN | regs::RX_DMA_BURST),
            (
                ChipRevision::V46,
                regs::RX128_INT_EN | regs::RX_MULTI_EN | regs::RX_DMA_BURST | regs::RX_EARLY_OFF,
            ),
            (ChipRevision::V63, regs::RX_FETCH_DFLT_8125 | regs::RX_DMA_BURST),
            (ChipRevision::V25, regs::RX128_INT_EN | regs::RX_DMA_BURST),
        ];
        for (rev, expected) in cases {
            let io = MockIo::new(rev);
            let hw = test_access(io.clone(), rev);
            hw.init_rxcfg();
            assert_eq!(io.peek32(regs::RX_CONFIG), expected, "{}", rev);
        }
    }

    #[test]
    fn test_tx_config_auto_fifo_on_evl_up() {
        let io = MockIo::new(ChipRevision::V46);
        let hw = test_access(io.clone(), ChipRevision::V46);
        hw.set_tx_config();
        let val = io.peek32(regs::TX_CONFIG);
        assert_eq!(val & regs::TXCFG_AUTO_FIFO, regs::TXCFG_AUTO_FIFO);
        assert_eq!(val & (7 << 8), 7 << 8);
        assert_eq!(val & (3 << 24), 3 << 24);
    }

    #[test]
    fn test_rar_set_programs_mac_and_exgmac_copy() {
        let io = MockIo::new(ChipRevision::V34);
        let hw = test_access(io.clone(), ChipRevision::V34);
        let mac = MacAddress::new([0x00, 0xe0, 0x4c, 0x11, 0x22, 0x33]);
        hw.rar_set(&mac).unwrap();
        assert_eq!(hw.read_mac_from(regs::MAC0), *mac.as_bytes());
        assert_eq!(hw.eri_read(0xe0), Ok(0x114c_e000));
        assert_eq!(hw.eri_read(0xe4), Ok(0x3322));
        assert_eq!(hw.eri_read(0xf0), Ok(0xe000_0000));
        assert_eq!(hw.eri_read(0xf4), Ok(0x3322_114c));
        assert_eq!(hw.config_unlock_depth(), 0);
    }

    #[test]
    fn test_stored_mac_sources() {
        let io = MockIo::new(ChipRevision::V46);
        let hw = test_access(io.clone(), ChipRevision::V46);
        hw.eri_write(0xe0, EriMask::M1111, 0x4433_2211).unwrap();
        hw.eri_write(0xe4, EriMask::M1111, 0x6655).unwrap();
        assert_eq!(
            hw.read_stored_mac(),
            Ok(Some(MacAddress::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66])))
        );

        let io = MockIo::new(ChipRevision::V25);
        let hw = test_access(io.clone(), ChipRevision::V25);
        assert_eq!(hw.read_stored_mac(), Ok(None));
    }

    #[test]
    fn test_jumbo_config_8168c_sets_both_enables() {
        let io = MockIo::new(ChipRevision::V20);
        let hw = test_access(io.clone(), ChipRevision::V20);
        hw.jumbo_config(9000, true);
        assert_eq!(io.peek8(regs::CONFIG3) & regs::JUMBO_EN0, regs::JUMBO_EN0);
        assert_eq!(io.peek8(regs::CONFIG4) & regs::JUMBO_EN1, regs::JUMBO_EN1);
        hw.jumbo_config(1500, true);
        assert_eq!(io.peek8(regs::CONFIG3) & regs::JUMBO_EN0, 0);
        assert_eq!(hw.config_unlock_depth(), 0);
    }

    #[test]
    fn test_aspm_clkreq_refuses_harmful_chips() {
        let io = MockIo::new(ChipRevision::V42);
        let hw = test_access(io.clone(), ChipRevision::V42);
        hw.aspm_clkreq(true, true).unwrap();
        assert_eq!(io.peek8(regs::CONFIG5) & regs::ASPM_EN, 0);

        let io = MockIo::new(ChipRevision::V46);
        let hw = test_access(io.clone(), ChipRevision::V46);
        hw.aspm_clkreq(true, true).unwrap();
        assert_eq!(io.peek8(regs::CONFIG5) & regs::ASPM_EN, regs::ASPM_EN);
        assert_eq!(io.peek8(regs::CONFIG2) & regs::CLK_REQ_EN, regs::CLK_REQ_EN);
        // Not OS-manageable: an enable request switches ASPM off.
        hw.aspm_clkreq(true, false).unwrap();
        assert_eq!(io.peek8(regs::CONFIG5) & regs::ASPM_EN, 0);
    }

    #[test]
    fn test_d3_pll_down_revision_gate() {
        let io = MockIo::new(ChipRevision::V28);
        let hw = test_access(io.clone(), ChipRevision::V28);
        hw.set_d3_pll_down(false);
        assert_eq!(io.peek8(regs::PMCH), 0);

        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        hw.set_d3_pll_down(false);
        assert_eq!(io.peek8(regs::PMCH), regs::D3_NO_PLL_DOWN);
        hw.set_d3_pll_down(true);
        assert_eq!(io.peek8(regs::PMCH), 0);
    }

    #[test]
    fn test_aspm_latency_falls_back_to_csi() {
        let io = MockIo::new(ChipRevision::V25);
        let hw = test_access(io.clone(), ChipRevision::V25);
        hw.platform().set_ext_config_ok(false);
        hw.csi_write(ASPM_LATENCY_CSI, 0x0012_3456).unwrap();
        hw.set_aspm_entry_latency(0x27).unwrap();
        assert_eq!(hw.csi_read(ASPM_LATENCY_CSI), Ok(0x2712_3456));
    }

    #[test]
    fn test_hw_initialize_8168g_handshake() {
        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        hw.hw_initialize().unwrap();
        assert_eq!(hw.mac_ocp_read(0xe8de).map(|v| v & 0xc000), Ok(0x8000));
        assert_eq!(io.peek32(regs::MISC) & regs::RXDV_GATED_EN, regs::RXDV_GATED_EN);

        io.poke8(regs::MCU, 0);
        assert_eq!(hw.hw_initialize(), Err(R8169Error::Timeout(Protocol::Mcu)));
    }

    #[test]
    fn test_quiesce_8168dp_waits_for_npq() {
        let io = MockIo::new(ChipRevision::V28);
        let hw = test_access(io.clone(), ChipRevision::V28);
        io.poke8(regs::TX_POLL, regs::NPQ);
        io.reset_read_count(regs::TX_POLL);
        assert_eq!(hw.quiesce(), Err(R8169Error::Timeout(Protocol::Mcu)));
        assert_eq!(io.read_count(regs::TX_POLL), POLL_NPQ.tries as usize);
    }
}
