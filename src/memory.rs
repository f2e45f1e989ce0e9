//! Validated reads over an opaque memory region.

use crate::arch::WORD_SIZE;
use crate::probe::Prober;

/// Read-only view of a memory space where any read may be refused.
///
/// `read_byte` is the single primitive; the sized helpers derive from it, so
/// an implementation only decides which addresses are readable. `None` means
/// the address was refused, never a partial value. Besides the live process
/// image this accommodates any other backing store a walker might run over,
/// such as a captured snapshot of a stack.
pub trait Memory {
    fn read_byte(&self, addr: usize) -> Option<u8>;

    fn read_word(&self, addr: usize) -> Option<usize> {
        let mut raw = [0u8; WORD_SIZE];
        self.read_into(addr, &mut raw)?;
        Some(usize::from_le_bytes(raw))
    }

    fn read_u32(&self, addr: usize) -> Option<u32> {
        let mut raw = [0u8; 4];
        self.read_into(addr, &mut raw)?;
        Some(u32::from_le_bytes(raw))
    }

    fn read_i32(&self, addr: usize) -> Option<i32> {
        self.read_u32(addr).map(|v| v as i32)
    }

    fn read_f32(&self, addr: usize) -> Option<f32> {
        self.read_u32(addr).map(f32::from_bits)
    }

    fn read_f64(&self, addr: usize) -> Option<f64> {
        let mut raw = [0u8; 8];
        self.read_into(addr, &mut raw)?;
        Some(f64::from_bits(u64::from_le_bytes(raw)))
    }

    fn read_into(&self, addr: usize, buf: &mut [u8]) -> Option<()> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte(addr.wrapping_add(i))?;
        }
        Some(())
    }
}

/// Address of the slot `offset` bytes from `base`.
pub fn slot_addr(base: usize, offset: isize) -> usize {
    base.wrapping_add_signed(offset)
}

/// The current process's own memory; every byte is probed before it is
/// dereferenced.
pub struct LiveMemory<'a> {
    prober: &'a Prober,
}

impl<'a> LiveMemory<'a> {
    pub fn new(prober: &'a Prober) -> Self {
        Self { prober }
    }
}

impl Memory for LiveMemory<'_> {
    fn read_byte(&self, addr: usize) -> Option<u8> {
        if !self.prober.is_readable(addr) {
            return None;
        }
        // the probe just confirmed this byte is mapped readable
        Some(unsafe { (addr as *const u8).read_volatile() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EightBytes;

    // 0x10..0x18 hold 01 02 03 04 05 06 07 08; everything else is refused
    impl Memory for EightBytes {
        fn read_byte(&self, addr: usize) -> Option<u8> {
            (0x10..0x18).contains(&addr).then(|| (addr - 0x10 + 1) as u8)
        }
    }

    #[test]
    fn sized_reads_assemble_little_endian() {
        let m = EightBytes;
        assert_eq!(m.read_u32(0x10), Some(0x0403_0201));
        assert_eq!(m.read_word(0x10), Some(0x0807_0605_0403_0201));
    }

    #[test]
    fn reads_crossing_the_refused_boundary_fail_whole() {
        let m = EightBytes;
        assert_eq!(m.read_u32(0x15), None);
        assert_eq!(m.read_word(0x11), None);
        assert_eq!(m.read_byte(0x18), None);
    }

    #[test]
    fn signed_reads_sign_extend() {
        struct MinusOne;
        impl Memory for MinusOne {
            fn read_byte(&self, _addr: usize) -> Option<u8> {
                Some(0xff)
            }
        }
        assert_eq!(MinusOne.read_i32(0), Some(-1));
    }

    #[test]
    fn slot_addresses_accept_negative_offsets() {
        assert_eq!(slot_addr(0x1000, 16), 0x1010);
        assert_eq!(slot_addr(0x1000, -8), 0xff8);
    }

    #[test]
    fn live_memory_reads_back_local_data() {
        let prober = Prober::new().unwrap();
        let mem = LiveMemory::new(&prober);
        let value: u64 = 0x1122_3344_5566_7788;
        let addr = &value as *const u64 as usize;
        assert_eq!(mem.read_word(addr), Some(value as usize));
        assert_eq!(mem.read_byte(0), None);
    }
}
