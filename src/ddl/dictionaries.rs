//! CREATE DICTIONARY
//
// CREATE DICTIONARY IF NOT EXISTS "countries"
// (
//     "id" UInt64,
//     "name" String DEFAULT 'unknown'
// )
// PRIMARY KEY "id"
// SOURCE(POSTGRESQL(HOST 'pg' PORT 5432 USER <env:PG_USER> PASSWORD <env:PG_PASSWORD> DB 'ref' TABLE 'countries'))
// LAYOUT(HASHED())
// LIFETIME(MIN 300 MAX 360)

use log::debug;

use crate::errors::Result;
use crate::metadata::{
    ClickHouseSource, DictionaryDescriptor, DictionarySource, HttpSource, RedisSource, ServerSource,
};
use crate::sql_formatter::{quote_identifier, quote_string, render_literal, LiteralStyle, SqlValue, StringEscape};
use crate::statement::SqlStatement;

use super::DdlBuilder;

impl DdlBuilder {
    pub(super) fn create_dictionary(&self, dictionary: &DictionaryDescriptor) -> Result<Vec<SqlStatement>> {
        dictionary.validate()?;
        let source = dictionary.source.resolve(&dictionary.name)?;
        let schema = dictionary.schema.as_deref();

        let columns = dictionary
            .columns
            .iter()
            .map(|column| {
                let name = column.resolved_name();
                let mut definition = format!(
                    "{} {}",
                    quote_identifier(&name),
                    self.registry.map_column(column)?
                );
                let default = dictionary
                    .defaults
                    .get(&name)
                    .or_else(|| dictionary.defaults.get(&column.property));
                if let Some(default) = default {
                    definition.push_str(&format!(
                        " DEFAULT {}",
                        render_literal(
                            &SqlValue::from(default),
                            Some(&column.clr_type),
                            LiteralStyle::VALUES
                        )
                    ));
                }
                Ok(definition)
            })
            .collect::<Result<Vec<_>>>()?;

        let keys: Vec<String> = dictionary
            .key_columns
            .iter()
            .map(|k| quote_identifier(k))
            .collect();

        let mut bindings = Vec::new();
        let source_sql = self.render_source(&source, schema, &mut bindings)?;
        debug!(
            "Dictionary {} reads from {} ({} deferred env bindings)",
            dictionary.name,
            source_kind(&source),
            bindings.len()
        );

        let sql = format!(
            "CREATE DICTIONARY{} {} ({}) PRIMARY KEY {} SOURCE({}) LAYOUT({}) LIFETIME(MIN {} MAX {})",
            self.if_not_exists(),
            self.qualified(schema, &dictionary.name),
            columns.join(", "),
            keys.join(", "),
            source_sql,
            dictionary.layout.render(),
            dictionary.lifetime.min_seconds,
            dictionary.lifetime.max_seconds
        );

        Ok(vec![SqlStatement::new(sql, self.display_name(schema, &dictionary.name))
            .with_env_bindings(bindings)])
    }

    fn render_source(
        &self,
        source: &DictionarySource,
        dictionary_schema: Option<&str>,
        bindings: &mut Vec<String>,
    ) -> Result<String> {
        match source {
            DictionarySource::ClickHouse(s) => {
                let database = s
                    .database
                    .as_deref()
                    .or(self.effective_schema(dictionary_schema));
                Ok(format!("CLICKHOUSE({})", clickhouse_source(s, database, bindings)?))
            }
            DictionarySource::Postgres(s) => Ok(format!("POSTGRESQL({})", server_source(s, bindings)?)),
            DictionarySource::MySql(s) => Ok(format!("MYSQL({})", server_source(s, bindings)?)),
            DictionarySource::Http(s) => Ok(format!("HTTP({})", http_source(s, bindings)?)),
            DictionarySource::Redis(s) => Ok(format!("REDIS({})", redis_source(s, bindings)?)),
        }
    }
}

fn source_kind(source: &DictionarySource) -> &'static str {
    match source {
        DictionarySource::ClickHouse(_) => "CLICKHOUSE",
        DictionarySource::Postgres(_) => "POSTGRESQL",
        DictionarySource::MySql(_) => "MYSQL",
        DictionarySource::Http(_) => "HTTP",
        DictionarySource::Redis(_) => "REDIS",
    }
}

fn literal(value: &str) -> String {
    quote_string(value, StringEscape::Backslash)
}

fn clickhouse_source(
    s: &ClickHouseSource,
    database: Option<&str>,
    bindings: &mut Vec<String>,
) -> Result<String> {
    let mut parts = Vec::new();
    if let Some(host) = &s.host {
        parts.push(format!("HOST {}", host.render(bindings)?));
    }
    if let Some(port) = s.port {
        parts.push(format!("PORT {}", port));
    }
    if let Some(user) = &s.user {
        parts.push(format!("USER {}", user.render(bindings)?));
    }
    if let Some(password) = &s.password {
        parts.push(format!("PASSWORD {}", password.render(bindings)?));
    }
    if let Some(db) = database {
        parts.push(format!("DB {}", literal(db)));
    }
    match s.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => parts.push(format!("QUERY {}", literal(query))),
        None => parts.push(format!("TABLE {}", literal(&s.table))),
    }
    Ok(parts.join(" "))
}

fn server_source(s: &ServerSource, bindings: &mut Vec<String>) -> Result<String> {
    Ok(format!(
        "HOST {} PORT {} USER {} PASSWORD {} DB {} TABLE {}",
        s.host.render(bindings)?,
        s.port,
        s.user.render(bindings)?,
        s.password.render(bindings)?,
        s.database.render(bindings)?,
        literal(&s.table)
    ))
}

fn http_source(s: &HttpSource, bindings: &mut Vec<String>) -> Result<String> {
    Ok(format!(
        "URL {} FORMAT {}",
        s.url.render(bindings)?,
        literal(&s.format)
    ))
}

fn redis_source(s: &RedisSource, bindings: &mut Vec<String>) -> Result<String> {
    let mut parts = vec![
        format!("HOST {}", s.host.render(bindings)?),
        format!("PORT {}", s.port),
    ];
    if let Some(storage) = &s.storage_type {
        parts.push(format!("STORAGE_TYPE {}", literal(storage)));
    }
    if let Some(index) = s.db_index {
        parts.push(format!("DB_INDEX {}", index));
    }
    if let Some(password) = &s.password {
        parts.push(format!("PASSWORD {}", password.render(bindings)?));
    }
    Ok(parts.join(" "))
}
