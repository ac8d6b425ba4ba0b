/// A logistic activation scaled by `amp`, so its range is `(0, amp)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sigmoid {
    amp: f32,
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    fn logistic(z: f32) -> f32 {
        if z >= 0. {
            1. / (1. + (-z).exp())
        } else {
            let e = z.exp();
            e / (1. + e)
        }
    }

    pub fn f(&self, z: f32) -> f32 {
        self.amp * Self::logistic(z)
    }

    pub fn df(&self, z: f32) -> f32 {
        let s = Self::logistic(z);
        self.amp * s * (1. - s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_at_zero() {
        let sigmoid = Sigmoid::new(2.);
        assert_eq!(sigmoid.f(0.), 1.);
        assert_eq!(sigmoid.df(0.), 0.5);
    }

    #[test]
    fn sigmoid_saturates_without_nan() {
        let sigmoid = Sigmoid::new(1.);
        assert_eq!(sigmoid.f(-200.), 0.);
        assert_eq!(sigmoid.df(-200.), 0.);
        assert_eq!(sigmoid.f(200.), 1.);
        assert_eq!(sigmoid.df(200.), 0.);
    }
}
