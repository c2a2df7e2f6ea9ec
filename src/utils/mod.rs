pub mod db_utils;
pub mod sql_script;
