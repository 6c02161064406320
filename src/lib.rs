//! huffchat: chat relay where each message carries its own Huffman code table.
//! Hexagonal layout: codec and entities in `domain`, boundaries in `ports`,
//! relay orchestration in `usecases`, sockets and storage in `adapters`.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
