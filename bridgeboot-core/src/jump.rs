//! Reference `Platform::jump` implementation for Armv7-M/v8-M parts.
//!
//! Ported from `ec-slimloader-imxrt`'s `bootload::boot_application`: reset
//! the NVIC, invalidate the icache, retarget VTOR, and hand off via
//! `cortex_m::asm::bootload`. Feature-gated because it is only correct on
//! targets `cortex-m` actually supports; integrators on other architectures
//! implement `Platform::jump` themselves.

use defmt_or_log::info;

/// Transfer control to `entry_point` as if it were the reset vector of a
/// freshly booted Cortex-M image.
///
/// # Safety
/// `entry_point` must address a valid vector table for this target, and the
/// image there must never return.
pub unsafe fn jump(entry_point: u32) -> ! {
    unsafe {
        cortex_m::interrupt::disable();

        let nvic = &*cortex_m::peripheral::NVIC::PTR;
        for clear_enable in &nvic.icer {
            clear_enable.write(u32::MAX);
        }
        for clear_pending in &nvic.icpr {
            clear_pending.write(u32::MAX);
        }
        for priority in &nvic.ipr {
            priority.write(0);
        }

        cortex_m::interrupt::enable();

        info!("jump: invalidating icache, retargeting VTOR to {:?}", entry_point);

        let mut p = cortex_m::Peripherals::steal();
        p.SCB.invalidate_icache();
        p.SCB.vtor.write(entry_point);

        cortex_m::asm::dmb();
        cortex_m::asm::dsb();
        cortex_m::asm::isb();

        cortex_m::asm::bootload(entry_point as *const u32)
    }
}
