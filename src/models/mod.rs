pub mod notification;
pub mod view;
pub mod websocket;
