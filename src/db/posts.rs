use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::graphql::types::{PaginatedPosts, Post};

/// Hard cap on page size, regardless of what the caller asks for.
pub const MAX_PAGE_SIZE: i64 = 50;

const POST_COLUMNS: &str = "id, creator_id, title, text, points, created_at, updated_at";

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        title: row.get(2)?,
        text: row.get(3)?,
        points: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Reverse-chronological feed page. `cursor` is an exclusive upper bound on
/// created_at (epoch ms); one extra row is fetched to detect a next page
/// without a second round trip.
pub fn list_posts(
    conn: &Connection,
    limit: i64,
    cursor: Option<i64>,
) -> Result<PaginatedPosts, rusqlite::Error> {
    // Clamp below as well: SQLite treats a negative LIMIT as "no limit",
    // which would let a negative request return the whole table.
    let real_limit = limit.clamp(0, MAX_PAGE_SIZE);
    let fetch_limit = real_limit + 1;

    let mut posts: Vec<Post> = match cursor {
        Some(before) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts \
                 WHERE created_at < ?1 \
                 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![before, fetch_limit], row_to_post)?;
            rows.collect::<Result<_, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts \
                 ORDER BY created_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![fetch_limit], row_to_post)?;
            rows.collect::<Result<_, _>>()?
        }
    };

    let has_more = posts.len() as i64 == fetch_limit;
    posts.truncate(real_limit as usize);

    Ok(PaginatedPosts { posts, has_more })
}

pub fn find_post(conn: &Connection, id: i64) -> Result<Option<Post>, rusqlite::Error> {
    let post = conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        params![id],
        row_to_post,
    );

    match post {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn create_post(
    conn: &Connection,
    creator_id: i64,
    title: &str,
    text: &str,
) -> Result<Post, rusqlite::Error> {
    let now = Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO posts (creator_id, title, text, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![creator_id, title, text, now],
    )?;

    let id = conn.last_insert_rowid();
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        params![id],
        row_to_post,
    )
}

/// Update a post's title and text, but only when `creator_id` owns it.
/// Returns None both for a missing post and for an ownership mismatch; the
/// two cases are deliberately not distinguished.
pub fn update_post(
    conn: &Connection,
    id: i64,
    creator_id: i64,
    title: &str,
    text: &str,
) -> Result<Option<Post>, rusqlite::Error> {
    let now = Utc::now().timestamp_millis();
    let changed = conn.execute(
        "UPDATE posts SET title = ?1, text = ?2, updated_at = ?3 \
         WHERE id = ?4 AND creator_id = ?5",
        params![title, text, now, id, creator_id],
    )?;

    if changed == 0 {
        return Ok(None);
    }
    find_post(conn, id)
}

/// Delete a post if `creator_id` owns it. Returns the number of rows
/// removed; a non-owner delete removes nothing. The ledger rows go with the
/// post via ON DELETE CASCADE.
pub fn delete_post(conn: &Connection, id: i64, creator_id: i64) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM posts WHERE id = ?1 AND creator_id = ?2",
        params![id, creator_id],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seed_post, seed_user, test_pool};

    #[test]
    fn list_posts_orders_newest_first() {
        let pool = test_pool();
        let user = seed_user(&pool, "alice");
        seed_post(&pool, user, "oldest", 100);
        seed_post(&pool, user, "middle", 200);
        seed_post(&pool, user, "newest", 300);

        let conn = pool.get().unwrap();
        let page = list_posts(&conn, 10, None).unwrap();
        assert!(!page.has_more);
        let titles: Vec<&str> = page.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn list_posts_reports_has_more_and_cursor_continues() {
        let pool = test_pool();
        let user = seed_user(&pool, "alice");
        seed_post(&pool, user, "oldest", 100);
        seed_post(&pool, user, "middle", 200);
        seed_post(&pool, user, "newest", 300);

        let conn = pool.get().unwrap();

        // First page: 2 newest posts, more remain
        let first = list_posts(&conn, 2, None).unwrap();
        assert!(first.has_more);
        assert_eq!(first.posts.len(), 2);
        assert_eq!(first.posts[0].title, "newest");
        assert_eq!(first.posts[1].title, "middle");

        // Second page from the last createdAt: the remaining post, no more
        let cursor = first.posts[1].created_at;
        let second = list_posts(&conn, 2, Some(cursor)).unwrap();
        assert!(!second.has_more);
        assert_eq!(second.posts.len(), 1);
        assert_eq!(second.posts[0].title, "oldest");
    }

    #[test]
    fn list_posts_cursor_is_exclusive() {
        let pool = test_pool();
        let user = seed_user(&pool, "alice");
        seed_post(&pool, user, "a", 100);
        seed_post(&pool, user, "b", 200);

        let conn = pool.get().unwrap();
        // Cursor equal to a post's created_at excludes that post
        let page = list_posts(&conn, 10, Some(200)).unwrap();
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.posts[0].title, "a");
    }

    #[test]
    fn list_posts_clamps_limit_to_50() {
        let pool = test_pool();
        let user = seed_user(&pool, "alice");
        for i in 0..60 {
            seed_post(&pool, user, &format!("post{i}"), i);
        }

        let conn = pool.get().unwrap();
        let page = list_posts(&conn, 100, None).unwrap();
        assert_eq!(page.posts.len(), 50);
        assert!(page.has_more);
    }

    #[test]
    fn list_posts_negative_limit_does_not_bypass_cap() {
        let pool = test_pool();
        let user = seed_user(&pool, "alice");
        for i in 0..60 {
            seed_post(&pool, user, &format!("post{i}"), i);
        }

        let conn = pool.get().unwrap();
        let page = list_posts(&conn, -5, None).unwrap();
        assert!(page.posts.len() <= 50);
        assert!(page.posts.is_empty());
    }

    #[test]
    fn list_posts_exact_page_has_no_more() {
        let pool = test_pool();
        let user = seed_user(&pool, "alice");
        seed_post(&pool, user, "a", 100);
        seed_post(&pool, user, "b", 200);

        let conn = pool.get().unwrap();
        let page = list_posts(&conn, 2, None).unwrap();
        assert_eq!(page.posts.len(), 2);
        assert!(!page.has_more);
    }

    #[test]
    fn find_post_returns_none_for_missing_id() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        assert!(find_post(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn create_post_starts_with_zero_points() {
        let pool = test_pool();
        let user = seed_user(&pool, "alice");
        let conn = pool.get().unwrap();
        let post = create_post(&conn, user, "hello", "world").unwrap();
        assert_eq!(post.points, 0);
        assert_eq!(post.creator_id, user);
        assert_eq!(post.created_at, post.updated_at);
    }

    #[test]
    fn update_post_requires_ownership() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let post = seed_post(&pool, alice, "original", 100);

        let conn = pool.get().unwrap();

        // Non-owner: None, row untouched
        let denied = update_post(&conn, post, bob, "hacked", "hacked").unwrap();
        assert!(denied.is_none());
        let unchanged = find_post(&conn, post).unwrap().unwrap();
        assert_eq!(unchanged.title, "original");

        // Owner: updated row comes back
        let updated = update_post(&conn, post, alice, "new title", "new text")
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "new title");
        assert_eq!(updated.text, "new text");
    }

    #[test]
    fn update_post_missing_id_returns_none() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let conn = pool.get().unwrap();
        assert!(update_post(&conn, 999, alice, "t", "x").unwrap().is_none());
    }

    #[test]
    fn delete_post_requires_ownership() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let post = seed_post(&pool, alice, "mine", 100);

        let conn = pool.get().unwrap();

        assert_eq!(delete_post(&conn, post, bob).unwrap(), 0);
        assert!(find_post(&conn, post).unwrap().is_some());

        assert_eq!(delete_post(&conn, post, alice).unwrap(), 1);
        assert!(find_post(&conn, post).unwrap().is_none());
    }

    #[test]
    fn delete_post_cascades_to_ledger() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let post = seed_post(&pool, alice, "mine", 100);

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO updoots (post_id, user_id, value) VALUES (?1, ?2, 1)",
            params![post, alice],
        )
        .unwrap();

        delete_post(&conn, post, alice).unwrap();
        let remaining: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM updoots WHERE post_id = ?1",
                params![post],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
