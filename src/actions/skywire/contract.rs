//! SuperETH contract interface
//!
//! SuperETH wraps ETH 1:1 and implements ERC-7802 style cross-chain
//! mint/burn restricted to the agent address. It is deployed at the same
//! address on every supported chain.

use crate::network::Network;
use alloy::sol;

sol! {
    interface ISuperETH {
        event Deposited(address indexed account, uint256 amount);
        event Withdrawn(address indexed account, uint256 amount);
        event CrosschainMinted(address indexed to, uint256 amount);
        event CrosschainBurned(address indexed from, uint256 amount);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);

        function deposit() external payable;
        function withdraw(uint256 amount) external;

        function crosschainMint(address to, uint256 amount) external;
        function crosschainBurn(address from, uint256 amount) external;
    }
}

/// Networks SuperETH is deployed on
pub fn supported_networks() -> Vec<Network> {
    vec![Network::base_sepolia(), Network::optimism_sepolia()]
}
