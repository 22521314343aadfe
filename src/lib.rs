#![recursion_limit = "256"]
#![allow(dead_code)]
#![warn(clippy::all)]

#[cfg(target_arch = "wasm32")]
#[global_allocator]
static ALLOC: talc::TalckWasm = unsafe { talc::TalckWasm::new_global() };

pub mod constants;
pub mod creep;
pub mod defense;
pub mod error;
pub mod game_loop;
pub mod logging;
pub mod memory;
pub mod military;
pub mod pathing;
pub mod room;
pub mod serialize;

#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
mod panic;

pub use crate::error::{BastionError, BastionResult};
pub use crate::game_loop::{Bastion, BastionConfig, TickReport};

#[cfg(target_arch = "wasm32")]
mod exports {
    use super::*;
    use crate::defense::Rect;
    use log::*;
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen(js_name = setup)]
    pub fn setup() {
        logging::setup_logging(logging::Info);
        panic::setup_panic_hook();
    }

    #[wasm_bindgen(js_name = game_loop)]
    pub fn game_loop_export() {
        host::tick();
    }

    #[wasm_bindgen(js_name = reload_config)]
    pub fn reload_config() {
        host::reload_config();
    }

    #[wasm_bindgen(js_name = add_squad)]
    pub fn add_squad(kind: String, operation_id: String, squad_id: String, target_room: String) -> bool {
        match host::add_squad(&kind, &operation_id, &squad_id, &target_room) {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to add squad: {}", err);
                false
            }
        }
    }

    /// Slot assigned to the new member, or -1 when the squad is full or unknown.
    #[wasm_bindgen(js_name = add_member)]
    pub fn add_member(operation_id: String, squad_id: String, name: String) -> i32 {
        host::add_member(&operation_id, &squad_id, &name)
            .map(|slot| slot as i32)
            .unwrap_or(-1)
    }

    /// Takes a JSON array of `{x1, y1, x2, y2}` rectangles and returns the wall
    /// tiles as a JSON array of `{x, y}`.
    #[wasm_bindgen(js_name = plan_walls)]
    pub fn plan_walls(room_name: String, protected: String) -> Option<String> {
        let protected: Vec<Rect> = match serde_json::from_str(&protected) {
            Ok(rects) => rects,
            Err(err) => {
                error!("Malformed protected areas: {}", err);
                return None;
            }
        };

        match host::plan_walls(&room_name, &protected) {
            Ok(tiles) => serde_json::to_string(&tiles).ok(),
            Err(err) => {
                error!("Wall planning failed for {}: {}", room_name, err);
                None
            }
        }
    }
}
