//! Repository for the `survey_questions` table.

use gd_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::survey::{CreateQuestion, SurveyQuestion, UpdateQuestion};

const COLUMNS: &str = "id, text, weight, levels, is_active, display_order, created_at, updated_at";

/// Provides CRUD operations for survey questions.
pub struct QuestionRepo;

impl QuestionRepo {
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &CreateQuestion,
    ) -> Result<SurveyQuestion, sqlx::Error> {
        let query = format!(
            "INSERT INTO survey_questions (text, weight, levels, display_order)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SurveyQuestion>(&query)
            .bind(&input.text)
            .bind(input.weight)
            .bind(&input.levels)
            .bind(input.display_order)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<SurveyQuestion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM survey_questions WHERE id = $1");
        sqlx::query_as::<_, SurveyQuestion>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// All questions, in display order.
    pub async fn list(db: impl PgExecutor<'_>) -> Result<Vec<SurveyQuestion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM survey_questions ORDER BY display_order, id");
        sqlx::query_as::<_, SurveyQuestion>(&query)
            .fetch_all(db)
            .await
    }

    /// Active questions applicable to `level`, ordered `(display_order, id)`.
    /// The position in this list is the canonical question number.
    pub async fn list_for_level(
        db: impl PgExecutor<'_>,
        level: i32,
    ) -> Result<Vec<SurveyQuestion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM survey_questions
             WHERE is_active AND $1 = ANY(levels)
             ORDER BY display_order, id"
        );
        sqlx::query_as::<_, SurveyQuestion>(&query)
            .bind(level)
            .fetch_all(db)
            .await
    }

    pub async fn update(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateQuestion,
    ) -> Result<Option<SurveyQuestion>, sqlx::Error> {
        let query = format!(
            "UPDATE survey_questions SET
                text = COALESCE($2, text),
                weight = COALESCE($3, weight),
                levels = COALESCE($4, levels),
                is_active = COALESCE($5, is_active),
                display_order = COALESCE($6, display_order),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SurveyQuestion>(&query)
            .bind(id)
            .bind(&input.text)
            .bind(input.weight)
            .bind(&input.levels)
            .bind(input.is_active)
            .bind(input.display_order)
            .fetch_optional(db)
            .await
    }

    /// Delete a question. Stored results keep their weight snapshot.
    pub async fn delete(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM survey_questions WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
