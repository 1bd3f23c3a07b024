//! Four 32-bit lanes in one 128-bit register.
//!
//! This is everything the packers need from the hardware. On `x86_64` the type wraps an
//! SSE2 `__m128i` (SSE2 is part of the x86_64 baseline, so there is nothing to detect at
//! runtime). Everywhere else, or with the `portable` feature, it is a plain `[u32; 4]`
//! which LLVM turns into vector code on its own.
//!
//! All arithmetic wraps, like the hardware does.

use std::fmt;

/// number of 32-bit lanes in a vector
pub(crate) const LANES: usize = 4;

#[cfg(all(target_arch = "x86_64", not(feature = "portable")))]
pub(crate) use sse2::U32x4;

#[cfg(not(all(target_arch = "x86_64", not(feature = "portable"))))]
pub(crate) use portable::U32x4;

impl U32x4 {
    /// OR of all four lanes
    #[inline]
    pub(crate) fn or_lanes(self) -> u32 {
        let [a, b, c, d] = self.to_array();
        a | b | c | d
    }
}

impl fmt::Debug for U32x4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("U32x4").field(&self.to_array()).finish()
    }
}

impl PartialEq for U32x4 {
    fn eq(&self, other: &Self) -> bool {
        self.to_array() == other.to_array()
    }
}

#[cfg(all(target_arch = "x86_64", not(feature = "portable")))]
#[allow(unsafe_code)]
mod sse2 {
    use super::LANES;
    use std::arch::x86_64::*;
    use std::ops::{Add, BitAnd, BitOr, Sub};

    // SAFETY (whole module): every intrinsic used here is SSE2, which all x86_64 targets
    // enable. Loads and stores go through slices that were bounds checked to hold
    // `LANES` elements right before the pointer is taken.

    #[derive(Clone, Copy)]
    pub(crate) struct U32x4(__m128i);

    impl U32x4 {
        #[inline(always)]
        pub(crate) fn splat(x: u32) -> Self {
            unsafe { U32x4(_mm_set1_epi32(x as i32)) }
        }

        /// reads `src[..4]`
        #[inline(always)]
        pub(crate) fn load(src: &[u32]) -> Self {
            let src = &src[..LANES];
            unsafe { U32x4(_mm_loadu_si128(src.as_ptr() as *const __m128i)) }
        }

        /// writes `dst[..4]`
        #[inline(always)]
        pub(crate) fn store(self, dst: &mut [u32]) {
            let dst = &mut dst[..LANES];
            unsafe { _mm_storeu_si128(dst.as_mut_ptr() as *mut __m128i, self.0) }
        }

        #[inline(always)]
        pub(crate) fn to_array(self) -> [u32; LANES] {
            let mut out = [0; LANES];
            self.store(&mut out);
            out
        }

        /// per-lane logical left shift, `n` in `0..32`
        #[inline(always)]
        pub(crate) fn shl(self, n: u32) -> Self {
            unsafe { U32x4(_mm_sll_epi32(self.0, _mm_cvtsi32_si128(n as i32))) }
        }

        /// per-lane logical right shift, `n` in `0..32`
        #[inline(always)]
        pub(crate) fn shr(self, n: u32) -> Self {
            unsafe { U32x4(_mm_srl_epi32(self.0, _mm_cvtsi32_si128(n as i32))) }
        }

        /// `[prev[3], self[0], self[1], self[2]]`: every lane sees its predecessor,
        /// lane 0 seeded from the previous vector's last lane
        #[inline(always)]
        pub(crate) fn borrow_last_lane(self, prev: Self) -> Self {
            unsafe {
                U32x4(_mm_or_si128(
                    _mm_slli_si128::<4>(self.0),
                    _mm_srli_si128::<12>(prev.0),
                ))
            }
        }

        /// last lane copied into all four
        #[inline(always)]
        pub(crate) fn broadcast_last(self) -> Self {
            unsafe { U32x4(_mm_shuffle_epi32::<0xFF>(self.0)) }
        }

        /// inclusive running sum across the lanes: `[a, a+b, a+b+c, a+b+c+d]`
        #[inline(always)]
        pub(crate) fn prefix_sum(self) -> Self {
            unsafe {
                let pairs = _mm_add_epi32(self.0, _mm_slli_si128::<4>(self.0));
                U32x4(_mm_add_epi32(pairs, _mm_slli_si128::<8>(pairs)))
            }
        }

        #[inline(always)]
        pub(crate) fn last_lane(self) -> u32 {
            unsafe { _mm_cvtsi128_si32(_mm_shuffle_epi32::<0xFF>(self.0)) as u32 }
        }
    }

    impl Add for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn add(self, rhs: Self) -> Self {
            unsafe { U32x4(_mm_add_epi32(self.0, rhs.0)) }
        }
    }

    impl Sub for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn sub(self, rhs: Self) -> Self {
            unsafe { U32x4(_mm_sub_epi32(self.0, rhs.0)) }
        }
    }

    impl BitAnd for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn bitand(self, rhs: Self) -> Self {
            unsafe { U32x4(_mm_and_si128(self.0, rhs.0)) }
        }
    }

    impl BitOr for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn bitor(self, rhs: Self) -> Self {
            unsafe { U32x4(_mm_or_si128(self.0, rhs.0)) }
        }
    }
}

#[cfg(not(all(target_arch = "x86_64", not(feature = "portable"))))]
mod portable {
    use super::LANES;
    use std::ops::{Add, BitAnd, BitOr, Sub};

    #[derive(Clone, Copy)]
    pub(crate) struct U32x4([u32; LANES]);

    impl U32x4 {
        #[inline(always)]
        fn zip_with(self, rhs: Self, f: impl Fn(u32, u32) -> u32) -> Self {
            let [a0, a1, a2, a3] = self.0;
            let [b0, b1, b2, b3] = rhs.0;
            U32x4([f(a0, b0), f(a1, b1), f(a2, b2), f(a3, b3)])
        }

        #[inline(always)]
        pub(crate) fn splat(x: u32) -> Self {
            U32x4([x; LANES])
        }

        /// reads `src[..4]`
        #[inline(always)]
        pub(crate) fn load(src: &[u32]) -> Self {
            let src = &src[..LANES];
            U32x4([src[0], src[1], src[2], src[3]])
        }

        /// writes `dst[..4]`
        #[inline(always)]
        pub(crate) fn store(self, dst: &mut [u32]) {
            dst[..LANES].copy_from_slice(&self.0);
        }

        #[inline(always)]
        pub(crate) fn to_array(self) -> [u32; LANES] {
            self.0
        }

        /// per-lane logical left shift, `n` in `0..32`
        #[inline(always)]
        pub(crate) fn shl(self, n: u32) -> Self {
            U32x4(self.0.map(|x| x << n))
        }

        /// per-lane logical right shift, `n` in `0..32`
        #[inline(always)]
        pub(crate) fn shr(self, n: u32) -> Self {
            U32x4(self.0.map(|x| x >> n))
        }

        /// `[prev[3], self[0], self[1], self[2]]`: every lane sees its predecessor,
        /// lane 0 seeded from the previous vector's last lane
        #[inline(always)]
        pub(crate) fn borrow_last_lane(self, prev: Self) -> Self {
            let [a, b, c, _] = self.0;
            U32x4([prev.0[3], a, b, c])
        }

        /// last lane copied into all four
        #[inline(always)]
        pub(crate) fn broadcast_last(self) -> Self {
            U32x4([self.0[3]; LANES])
        }

        /// inclusive running sum across the lanes: `[a, a+b, a+b+c, a+b+c+d]`
        #[inline(always)]
        pub(crate) fn prefix_sum(self) -> Self {
            let [a, b, c, d] = self.0;
            let pairs = [a, b.wrapping_add(a), c.wrapping_add(b), d.wrapping_add(c)];
            let [p0, p1, p2, p3] = pairs;
            U32x4([p0, p1, p2.wrapping_add(p0), p3.wrapping_add(p1)])
        }

        #[inline(always)]
        pub(crate) fn last_lane(self) -> u32 {
            self.0[3]
        }
    }

    impl Add for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn add(self, rhs: Self) -> Self {
            self.zip_with(rhs, u32::wrapping_add)
        }
    }

    impl Sub for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn sub(self, rhs: Self) -> Self {
            self.zip_with(rhs, u32::wrapping_sub)
        }
    }

    impl BitAnd for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn bitand(self, rhs: Self) -> Self {
            self.zip_with(rhs, |a, b| a & b)
        }
    }

    impl BitOr for U32x4 {
        type Output = Self;
        #[inline(always)]
        fn bitor(self, rhs: Self) -> Self {
            self.zip_with(rhs, |a, b| a | b)
        }
    }
}
