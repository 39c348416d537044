use uuid::Uuid;

use crate::services::db_models::Layout;
use crate::types::LAYOUT_KEY;

pub fn layout_key(restaurant_id: Uuid) -> String {
    format!("{LAYOUT_KEY}_{restaurant_id}")
}

/// Bumped on every invalidation; a layout read before the bump is never stored.
pub fn generation_key(restaurant_id: Uuid) -> String {
    format!("{LAYOUT_KEY}_gen_{restaurant_id}")
}

fn is_current(seen: u64, stored: Option<u64>) -> bool {
    stored.unwrap_or(0) == seen
}

/// Stores the layout unless the cache was invalidated since generation `seen`
/// was read. Returns whether it was stored.
pub fn put_layout(redis_db: &redis::Client, layout: &Layout, seen: u64, ttl_s: u64) -> Result<bool, String> {
    let layout_json = match serde_json::to_string(layout) {
        Ok(json) => json,
        Err(_) => return Err("Failed to compose JSON object of layout".into())
    };

    let mut conn = match redis_db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into())
    };

    let key = layout_key(layout.restaurant.id);
    let gen_key = generation_key(layout.restaurant.id);

    let stored = redis::transaction(&mut conn, &[&gen_key], |conn, pipe| {
        let generation: Option<u64> = redis::cmd("GET").arg(&gen_key).query(conn)?;
        if !is_current(seen, generation) {
            return Ok(Some(false));
        }

        pipe.cmd("SET")
            .arg(&key)
            .arg(&layout_json)
            .arg("EX")
            .arg(ttl_s)
            .ignore()
            .query::<Option<()>>(conn)
            .map(|done| done.map(|()| true))
    });

    match stored {
        Ok(stored) => Ok(stored),
        Err(err) => Err(format!("Failed to store layout: {err}"))
    }
}

/// Cached public layout JSON (`None` on a miss) and the cache generation it
/// was read at.
pub fn get_layout(redis_db: &redis::Client, restaurant_id: Uuid) -> Result<(Option<String>, u64), String> {
    let mut conn = match redis_db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into())
    };

    match redis::cmd("MGET")
        .arg(layout_key(restaurant_id))
        .arg(generation_key(restaurant_id))
        .query::<(Option<String>, Option<u64>)>(&mut conn)
    {
        Ok((cached, generation)) => Ok((cached, generation.unwrap_or(0))),
        Err(_) => Err("Failed to get JSON object of layout from redis db".into())
    }
}

pub fn invalidate_layout(redis_db: &redis::Client, restaurant_id: Uuid) -> Result<(), String> {
    let mut conn = match redis_db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into())
    };

    match redis::pipe()
        .atomic()
        .cmd("INCR").arg(generation_key(restaurant_id)).ignore()
        .cmd("DEL").arg(layout_key(restaurant_id)).ignore()
        .query::<()>(&mut conn)
    {
        Ok(()) => Ok(()),
        Err(err) => Err(format!("Failed to drop cached layout: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_restaurant() {
        let id = Uuid::nil();
        assert_eq!(layout_key(id), "layout_00000000-0000-0000-0000-000000000000");
        assert_eq!(generation_key(id), "layout_gen_00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn layouts_read_before_an_invalidation_are_not_stored() {
        assert!(is_current(0, None));
        assert!(is_current(3, Some(3)));
        assert!(!is_current(0, Some(1)));
        assert!(!is_current(3, Some(4)));
    }
}
