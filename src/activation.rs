//! Activation functions.
//!
//! Every activation carries its derivative expressed in terms of the
//! activation's *output*: backpropagation only keeps `y = f(x)` around, so
//! `df` receives `y` and never `x`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

pub fn sigmoid(x: f64) -> f64 {
    1. / (1. + (-x).exp())
}

pub fn sigmoid_derivative(y: f64) -> f64 {
    y * (1. - y)
}

pub fn relu(x: f64) -> f64 {
    x.max(0.)
}

pub fn relu_derivative(y: f64) -> f64 {
    if y > 0. { 1. } else { 0. }
}

pub fn tanh(x: f64) -> f64 {
    x.tanh()
}

pub fn tanh_derivative(y: f64) -> f64 {
    1. - y * y
}

pub fn signed_root(x: f64) -> f64 {
    x.signum() * x.abs().sqrt()
}

/// Singular at `y = 0`, where it is defined as `0`.
pub fn signed_root_derivative(y: f64) -> f64 {
    if y == 0. { 0. } else { 1. / (2. * y) }
}

pub fn cube_root(x: f64) -> f64 {
    x.cbrt()
}

/// Singular at `y = 0`, where it is defined as `0`.
pub fn cube_root_derivative(y: f64) -> f64 {
    if y == 0. { 0. } else { 1. / (3. * y * y) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Activation {
    Sigmoid,
    Relu,
    Tanh,
    SignedRoot,
    CubeRoot,
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Sigmoid
    }
}

impl Activation {
    pub const ALL: [Activation; 5] = [
        Activation::Sigmoid,
        Activation::Relu,
        Activation::Tanh,
        Activation::SignedRoot,
        Activation::CubeRoot,
    ];

    #[inline(always)]
    pub fn f(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(x),
            Activation::Relu => relu(x),
            Activation::Tanh => tanh(x),
            Activation::SignedRoot => signed_root(x),
            Activation::CubeRoot => cube_root(x),
        }
    }

    /// Derivative given the activation output `y = f(x)`.
    #[inline(always)]
    pub fn df(self, y: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid_derivative(y),
            Activation::Relu => relu_derivative(y),
            Activation::Tanh => tanh_derivative(y),
            Activation::SignedRoot => signed_root_derivative(y),
            Activation::CubeRoot => cube_root_derivative(y),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::SignedRoot => "signedRoot",
            Activation::CubeRoot => "cubeRoot",
        }
    }

    /// Selector understood by the compute shaders.
    #[cfg_attr(not(feature = "gpu"), allow(dead_code))]
    pub(crate) fn shader_code(self) -> u32 {
        match self {
            Activation::Sigmoid => 0,
            Activation::Relu => 1,
            Activation::Tanh => 2,
            Activation::SignedRoot => 3,
            Activation::CubeRoot => 4,
        }
    }
}

impl FromStr for Activation {
    type Err = Error;

    /// Case-insensitive; `-` and `_` separators are ignored so `signed-root`,
    /// `signed_root` and `signedRoot` all resolve. Unknown names are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "signedroot" => Ok(Activation::SignedRoot),
            "cuberoot" => Ok(Activation::CubeRoot),
            _ => Err(Error::UnknownActivation(s.to_string())),
        }
    }
}

impl TryFrom<String> for Activation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Activation> for String {
    fn from(a: Activation) -> Self {
        a.name().to_string()
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn resolves_names_ignoring_case_and_separators() {
        assert_eq!("sigmoid".parse::<Activation>().unwrap(), Activation::Sigmoid);
        assert_eq!("ReLU".parse::<Activation>().unwrap(), Activation::Relu);
        assert_eq!("TANH".parse::<Activation>().unwrap(), Activation::Tanh);
        assert_eq!("signed-root".parse::<Activation>().unwrap(), Activation::SignedRoot);
        assert_eq!("signedRoot".parse::<Activation>().unwrap(), Activation::SignedRoot);
        assert_eq!("cube_root".parse::<Activation>().unwrap(), Activation::CubeRoot);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "softplus".parse::<Activation>().unwrap_err();
        assert!(matches!(err, Error::UnknownActivation(ref n) if n == "softplus"));
        assert!(err.is_precondition());
    }

    #[test]
    fn names_round_trip() {
        for a in Activation::ALL {
            assert_eq!(a.name().parse::<Activation>().unwrap(), a);
        }
    }

    #[test]
    fn derivatives_match_numeric_slope() {
        let h = 1e-6;
        for a in Activation::ALL {
            for x in [-1.7, -0.4, 0.3, 1.2] {
                if a == Activation::Relu && x < 0. {
                    continue;
                }
                let y = a.f(x);
                if a == Activation::SignedRoot && x < 0. {
                    // 1/(2y) keeps the sign of y, so it is the negated slope on the left branch
                    assert_eq!(a.df(y), 1. / (2. * y));
                    assert!(a.df(y) < 0.);
                    continue;
                }
                let numeric = (a.f(x + h) - a.f(x - h)) / (2. * h);
                assert_abs_diff_eq!(numeric, a.df(y), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn root_derivatives_are_zero_at_origin() {
        assert_eq!(Activation::SignedRoot.df(0.), 0.);
        assert_eq!(Activation::CubeRoot.df(0.), 0.);
        assert_eq!(Activation::SignedRoot.df(-0.), 0.);
    }

    #[test]
    fn roots_keep_the_sign() {
        assert_abs_diff_eq!(Activation::SignedRoot.f(-4.), -2., epsilon = 1e-12);
        assert_abs_diff_eq!(Activation::CubeRoot.f(-8.), -2., epsilon = 1e-12);
        assert_eq!(Activation::SignedRoot.f(0.), 0.);
    }

    #[test]
    fn sigmoid_of_zero_is_one_half() {
        assert_eq!(Activation::Sigmoid.f(0.), 0.5);
        assert_eq!(Activation::Sigmoid.df(0.5), 0.25);
    }

    #[test]
    fn deserializes_from_yaml_string() {
        let a: Activation = serde_yaml::from_str("tanh").unwrap();
        assert_eq!(a, Activation::Tanh);
        assert!(serde_yaml::from_str::<Activation>("gelu").is_err());
    }
}
