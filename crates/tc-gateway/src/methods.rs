//! Static descriptor table for the registry contract surface. Both calling
//! conventions are generated from this one table, so they cannot drift.

use crate::abi;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    View,
    Transact,
}

pub struct MethodDescriptor {
    pub name: &'static str,
    pub signature: &'static str,
    pub arity: usize,
    pub kind: MethodKind,
    selector: OnceLock<[u8; 4]>,
}

impl MethodDescriptor {
    const fn new(
        name: &'static str,
        signature: &'static str,
        arity: usize,
        kind: MethodKind,
    ) -> Self {
        Self {
            name,
            signature,
            arity,
            kind,
            selector: OnceLock::new(),
        }
    }

    /// Derived once per descriptor, shared by reference thereafter.
    pub fn selector(&self) -> [u8; 4] {
        *self
            .selector
            .get_or_init(|| abi::selector(self.signature))
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("kind", &self.kind)
            .finish()
    }
}

pub static ADMIN: MethodDescriptor =
    MethodDescriptor::new("admin", "admin()", 0, MethodKind::View);
pub static IS_SELLER: MethodDescriptor =
    MethodDescriptor::new("is_seller", "isSeller(address)", 1, MethodKind::View);
pub static PRODUCT_OWNER: MethodDescriptor =
    MethodDescriptor::new("product_owner", "productOwner(string)", 1, MethodKind::View);
pub static VERIFY_PRODUCT: MethodDescriptor =
    MethodDescriptor::new("verify_product", "verifyProduct(string)", 1, MethodKind::View);
pub static SUCCESSOR_OF: MethodDescriptor =
    MethodDescriptor::new("successor_of", "successorOf(address)", 1, MethodKind::View);
pub static REGISTER_PRODUCT: MethodDescriptor = MethodDescriptor::new(
    "register_product",
    "registerProduct(string,string)",
    2,
    MethodKind::Transact,
);
pub static TRANSFER_PRODUCT: MethodDescriptor = MethodDescriptor::new(
    "transfer_product",
    "transferProduct(string,address)",
    2,
    MethodKind::Transact,
);
pub static ADD_SELLER: MethodDescriptor =
    MethodDescriptor::new("add_seller", "addSeller(address)", 1, MethodKind::Transact);
pub static DECLARE_SUCCESSOR: MethodDescriptor = MethodDescriptor::new(
    "declare_successor",
    "declareSuccessor(address)",
    1,
    MethodKind::Transact,
);

pub static METHODS: [&MethodDescriptor; 9] = [
    &ADMIN,
    &IS_SELLER,
    &PRODUCT_OWNER,
    &VERIFY_PRODUCT,
    &SUCCESSOR_OF,
    &REGISTER_PRODUCT,
    &TRANSFER_PRODUCT,
    &ADD_SELLER,
    &DECLARE_SUCCESSOR,
];

pub fn descriptor(name: &str) -> Option<&'static MethodDescriptor> {
    METHODS.iter().copied().find(|entry| entry.name == name)
}
