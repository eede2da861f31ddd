use crate::*;
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// The multiplicative group (p, q, g) that all group elements belong to.
///
/// `p` is the modulus, `q` the order of the subgroup generated by `g`.
/// Every entity carrying group elements must share the same group; this is
/// checked wherever elements cross an API boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptionGroup {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
}

impl EncryptionGroup {
    pub fn new(p: BigUint, q: BigUint, g: BigUint) -> Result<Self, ValidationError> {
        if (&p % 2u8).is_zero() || p <= BigUint::from(3u8) {
            return Err(ValidationError::InvalidEncryptionGroup("p must be an odd prime"));
        }
        if q.is_zero() || q >= p {
            return Err(ValidationError::InvalidEncryptionGroup("q must be positive and smaller than p"));
        }
        if g <= BigUint::one() || g >= p {
            return Err(ValidationError::InvalidEncryptionGroup("g must be in (1, p)"));
        }
        if !g.modpow(&q, &p).is_one() {
            return Err(ValidationError::InvalidEncryptionGroup("g does not generate a subgroup of order q"));
        }
        Ok(EncryptionGroup { p, q, g })
    }

    /// The multiplicative identity.
    pub fn identity(&self) -> GroupElement {
        GroupElement(BigUint::one())
    }

    pub fn generator(&self) -> GroupElement {
        GroupElement(self.g.clone())
    }

    /// Membership in the q-order subgroup.
    pub fn contains(&self, element: &GroupElement) -> bool {
        !element.0.is_zero() && element.0 < self.p && element.0.modpow(&self.q, &self.p).is_one()
    }

    pub fn multiply(&self, left: &GroupElement, right: &GroupElement) -> GroupElement {
        GroupElement((&left.0 * &right.0) % &self.p)
    }

    pub fn exponentiate(&self, base: &GroupElement, exponent: &BigUint) -> GroupElement {
        GroupElement(base.0.modpow(exponent, &self.p))
    }
}

impl Hashable for EncryptionGroup {
    fn to_hash_input(&self) -> HashInput {
        HashInput::List(vec![
            HashInput::Int(self.p.clone()),
            HashInput::Int(self.q.clone()),
            HashInput::Int(self.g.clone()),
        ])
    }
}

/// An element of an encryption group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupElement(pub BigUint);

impl GroupElement {
    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

impl Hashable for GroupElement {
    fn to_hash_input(&self) -> HashInput {
        HashInput::Int(self.0.clone())
    }
}

/// An ElGamal ciphertext under an encryption group.
///
/// Vote ciphertexts are compared value-for-value across replicas by the
/// dispute resolver; equality here is plain structural equality.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub gamma: GroupElement,
    pub phis: Vec<GroupElement>,
}

impl Hashable for Ciphertext {
    fn to_hash_input(&self) -> HashInput {
        HashInput::List(vec![
            self.gamma.to_hash_input(),
            HashInput::List(self.phis.iter().map(Hashable::to_hash_input).collect()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> EncryptionGroup {
        // p = 23, q = 11, g = 2: the quadratic residues mod 23
        EncryptionGroup::new(BigUint::from(23u8), BigUint::from(11u8), BigUint::from(2u8)).unwrap()
    }

    #[test]
    fn reject_bad_groups() {
        assert!(EncryptionGroup::new(BigUint::from(24u8), BigUint::from(11u8), BigUint::from(2u8)).is_err());
        assert!(EncryptionGroup::new(BigUint::from(23u8), BigUint::from(0u8), BigUint::from(2u8)).is_err());
        assert!(EncryptionGroup::new(BigUint::from(23u8), BigUint::from(11u8), BigUint::from(1u8)).is_err());
        // 5 is not a quadratic residue mod 23
        assert!(EncryptionGroup::new(BigUint::from(23u8), BigUint::from(11u8), BigUint::from(5u8)).is_err());
    }

    #[test]
    fn multiply_and_membership() {
        let group = group();
        let a = group.exponentiate(&group.generator(), &BigUint::from(3u8));
        let b = group.exponentiate(&group.generator(), &BigUint::from(5u8));

        assert!(group.contains(&a));
        assert!(group.contains(&b));
        assert!(!group.contains(&GroupElement(BigUint::from(5u8))));

        let product = group.multiply(&a, &b);
        let expected = group.exponentiate(&group.generator(), &BigUint::from(8u8));
        assert_eq!(product, expected);

        assert_eq!(group.multiply(&a, &group.identity()), a);
    }
}
