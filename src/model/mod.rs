pub mod city_standard;
pub mod contribution;
pub mod salary;
