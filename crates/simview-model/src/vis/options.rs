/// Number of geom visibility groups.
pub const GEOM_GROUPS: usize = 6;

/// Display options applied by [`update_scene`](super::update_scene).
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Per-group geom visibility, indexed by `Geom::group`.
    pub geom_group: [bool; GEOM_GROUPS],
    /// Include lights from the model (otherwise a headlight is used).
    pub model_lights: bool,
}

impl Default for Options {
    fn default() -> Self {
        let mut opt = Self {
            geom_group: [false; GEOM_GROUPS],
            model_lights: false,
        };
        default_options(&mut opt);
        opt
    }
}

/// Groups 0-2 visible, 3-5 hidden, model lights on.
pub fn default_options(opt: &mut Options) {
    opt.geom_group = [true, true, true, false, false, false];
    opt.model_lights = true;
}

/// Geom categories to include in a scene update.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Catmask(u8);

impl Catmask {
    pub const STATIC: Self = Self(1 << 0);
    pub const DYNAMIC: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::STATIC.0 | Self::DYNAMIC.0);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Catmask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catmask_composition() {
        assert!(Catmask::ALL.contains(Catmask::STATIC));
        assert!(Catmask::ALL.contains(Catmask::DYNAMIC));
        assert!(!Catmask::STATIC.contains(Catmask::DYNAMIC));
        assert_eq!(Catmask::STATIC | Catmask::DYNAMIC, Catmask::ALL);
    }
}
