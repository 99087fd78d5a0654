use std::collections::{HashMap, HashSet};
use tc_api_types::AccountAddress;
use tc_gateway::abi::{self, AbiValue};
use tc_gateway::{
    ADD_SELLER, ADMIN, DECLARE_SUCCESSOR, IS_SELLER, PRODUCT_OWNER, REGISTER_PRODUCT,
    SUCCESSOR_OF, TRANSFER_PRODUCT, VERIFY_PRODUCT,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub owner: AccountAddress,
}

/// In-memory stand-in for the on-chain registry. Calldata in, ABI-encoded
/// return data (or a revert reason) out.
pub struct MockRegistry {
    admin: AccountAddress,
    sellers: HashSet<AccountAddress>,
    products: HashMap<String, ProductRecord>,
    successors: HashMap<AccountAddress, AccountAddress>,
}

fn zero_address() -> AccountAddress {
    AccountAddress::from_bytes(&[0_u8; 20])
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self {
            admin: zero_address(),
            sellers: HashSet::new(),
            products: HashMap::new(),
            successors: HashMap::new(),
        }
    }
}

impl MockRegistry {
    pub fn admin(&self) -> &AccountAddress {
        &self.admin
    }

    pub fn set_admin(&mut self, admin: AccountAddress) {
        self.admin = admin;
    }

    pub fn grant_seller(&mut self, seller: AccountAddress) {
        self.sellers.insert(seller);
    }

    pub fn product(&self, id: &str) -> Option<&ProductRecord> {
        self.products.get(id)
    }

    pub fn execute_view(&self, calldata: &[u8]) -> Result<Vec<u8>, String> {
        let (selector, args) = split_calldata(calldata)?;

        if selector == ADMIN.selector() {
            return Ok(abi::encode_arguments(&[AbiValue::Address(self.admin.clone())]));
        }
        if selector == IS_SELLER.selector() {
            let who = decode_address(args, 0)?;
            let member = self.sellers.contains(&who);
            return Ok(abi::encode_arguments(&[AbiValue::Bool(member)]));
        }
        if selector == PRODUCT_OWNER.selector() {
            let id = decode_string(args, 0)?;
            let owner = self
                .products
                .get(&id)
                .map(|record| record.owner.clone())
                .unwrap_or_else(zero_address);
            return Ok(abi::encode_arguments(&[AbiValue::Address(owner)]));
        }
        if selector == VERIFY_PRODUCT.selector() {
            let id = decode_string(args, 0)?;
            return Ok(abi::encode_arguments(&[AbiValue::Bool(
                self.products.contains_key(&id),
            )]));
        }
        if selector == SUCCESSOR_OF.selector() {
            let owner = decode_address(args, 0)?;
            let heir = self
                .successors
                .get(&owner)
                .cloned()
                .unwrap_or_else(zero_address);
            return Ok(abi::encode_arguments(&[AbiValue::Address(heir)]));
        }

        Err("unknown method selector".to_owned())
    }

    pub fn execute_transact(&mut self, from: &AccountAddress, calldata: &[u8]) -> Result<(), String> {
        let (selector, args) = split_calldata(calldata)?;

        if selector == REGISTER_PRODUCT.selector() {
            let id = decode_string(args, 0)?;
            let name = decode_string(args, 1)?;
            if !self.sellers.contains(from) && *from != self.admin {
                return Err("caller is not a registered seller".to_owned());
            }
            if self.products.contains_key(&id) {
                return Err("product already registered".to_owned());
            }
            self.products.insert(
                id,
                ProductRecord {
                    name,
                    owner: from.clone(),
                },
            );
            return Ok(());
        }
        if selector == TRANSFER_PRODUCT.selector() {
            let id = decode_string(args, 0)?;
            let to = decode_address(args, 1)?;
            let record = self
                .products
                .get_mut(&id)
                .ok_or_else(|| "unknown product".to_owned())?;
            if record.owner != *from {
                return Err("caller does not own product".to_owned());
            }
            record.owner = to;
            return Ok(());
        }
        if selector == ADD_SELLER.selector() {
            if *from != self.admin {
                return Err("caller is not admin".to_owned());
            }
            let seller = decode_address(args, 0)?;
            self.sellers.insert(seller);
            return Ok(());
        }
        if selector == DECLARE_SUCCESSOR.selector() {
            let heir = decode_address(args, 0)?;
            self.successors.insert(from.clone(), heir);
            return Ok(());
        }

        Err("unknown or read-only method selector".to_owned())
    }
}

fn split_calldata(calldata: &[u8]) -> Result<([u8; 4], &[u8]), String> {
    if calldata.len() < 4 {
        return Err("calldata shorter than a selector".to_owned());
    }
    let mut selector = [0_u8; 4];
    selector.copy_from_slice(&calldata[..4]);
    Ok((selector, &calldata[4..]))
}

fn decode_address(args: &[u8], index: usize) -> Result<AccountAddress, String> {
    abi::decode_address_arg(args, index).map_err(|err| err.to_string())
}

fn decode_string(args: &[u8], index: usize) -> Result<String, String> {
    abi::decode_string_arg(args, index).map_err(|err| err.to_string())
}
