//! Shader flag word stored next to every compiled permutation.
//!
//! The low bits identify the binary format of the payload, the high bits are
//! optional hardware features requested per shader in the manifest.

bitflags::bitflags! {
    /// Per-permutation flag word (little-endian `u32` in the blob header).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFlags: u32 {
        /// Payload is legacy DXBC bytecode
        const DXBC = 0x01;
        /// Payload is DXIL
        const DXIL = 0x02;
        /// Payload is SPIR-V
        const SPIRV = 0x04;

        /// Uses the vendor UAV extension (manifest letter `H`)
        const UAV_EXTENSION = 0x20;
        /// Uses the fast geometry shader path (manifest letter `G`)
        const FAST_GS = 0x40;
        /// Uses typed UAV loads (manifest letter `U`)
        const TYPED_UAV_LOAD = 0x80;
        /// Uses wave match intrinsics (manifest letter `M`)
        const WAVE_MATCH = 0x100;
    }
}

impl ShaderFlags {
    /// All bits that describe the payload format.
    pub const FORMAT_MASK: Self = Self::DXBC.union(Self::DXIL).union(Self::SPIRV);

    /// Map a manifest feature letter to its flag.
    ///
    /// Letters are matched case-insensitively. Returns `None` for anything
    /// outside the recognized alphabet.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'H' => Some(Self::UAV_EXTENSION),
            'G' => Some(Self::FAST_GS),
            'U' => Some(Self::TYPED_UAV_LOAD),
            'M' => Some(Self::WAVE_MATCH),
            _ => None,
        }
    }

    /// The payload format bits only.
    pub fn format(self) -> Self {
        self.intersection(Self::FORMAT_MASK)
    }
}
